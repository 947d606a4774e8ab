use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Datelike;

use crate::core::color::ColorName;
use crate::core::model::{CalendarRun, DayRecord};
use crate::export::Exporter;
use crate::records::flag_tags;

/// Writes `calendar.html`: every day with the evidence that decided it.
#[derive(Debug, Clone)]
pub struct HtmlDebugExporter {
    out_dir: PathBuf,
}

impl HtmlDebugExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn day_to_div(record: &DayRecord) -> String {
        let ev = &record.evidence;
        let band = ev.color_band.map(|b| b.as_str()).unwrap_or("none");
        format!(
            r#"<div class='day {day_type} band-{band}' data-date='{date}' data-type='{day_type}' data-band='{band}' data-star='{star}' data-asterisk='{asterisk}' data-text='{text}' data-daynum='{daynum}' data-flags='{flags}'><span class='num'>{day}</span><span class='desc'>{desc}</span></div>"#,
            day_type = record.day_type.as_str(),
            band = band,
            date = record.date,
            star = ev.has_star_symbol,
            asterisk = ev.has_asterisk_symbol,
            text = html_escape::encode_single_quoted_attribute(&ev.ocr_text),
            daynum = ev.day_number.map(|d| d.to_string()).unwrap_or_default(),
            flags = html_escape::encode_single_quoted_attribute(&flag_tags(&record.flags).join(" ")),
            day = record.date.day(),
            desc = html_escape::encode_text(&record.description),
        )
    }
}

fn swatch(band: ColorName) -> &'static str {
    match band {
        ColorName::Jade => "#00a896",
        ColorName::Purple => "#8000a0",
        ColorName::Pink => "#ff69b4",
        ColorName::Yellow => "#ffdc00",
        ColorName::Brown => "#965a28",
        ColorName::Green => "#3cb43c",
    }
}

impl Exporter for HtmlDebugExporter {
    fn export(&self, run: &CalendarRun) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let mut months_html = String::new();
        let mut current: Option<(i32, u32)> = None;
        for record in &run.days {
            let key = (record.date.year(), record.date.month());
            if current != Some(key) {
                if current.is_some() {
                    months_html.push_str("</div></section>\n");
                }
                months_html.push_str(&format!(
                    "<section><h2>{}-{:02}</h2><div class='month'>",
                    key.0, key.1
                ));
                current = Some(key);
            }
            months_html.push_str(&HtmlDebugExporter::day_to_div(record));
        }
        if current.is_some() {
            months_html.push_str("</div></section>\n");
        }

        let band_css: String = [
            ColorName::Jade,
            ColorName::Purple,
            ColorName::Pink,
            ColorName::Yellow,
            ColorName::Brown,
            ColorName::Green,
        ]
        .iter()
        .map(|b| format!(".band-{} {{ border-left: 8px solid {}; }}\n", b.as_str(), swatch(*b)))
        .collect();

        let failures_html: String = run
            .failures
            .iter()
            .map(|f| {
                format!(
                    "<li>page {}: {}</li>",
                    f.page_idx + 1,
                    html_escape::encode_text(&f.error)
                )
            })
            .collect();

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset='utf-8'>
<title>calgrid debug</title>
<style>
body {{ margin: 20px; font-family: Arial, sans-serif; }}
.month {{ display: grid; grid-template-columns: repeat(7, 1fr); gap: 4px; max-width: 980px; }}
.day {{ border: 1px solid #ccc; padding: 4px; min-height: 48px; font-size: 12px; cursor: pointer; }}
.day .num {{ font-weight: bold; margin-right: 6px; }}
.day.weekend {{ background: #f2f2f2; }}
.day.unknown {{ background: rgba(255,0,0,0.12); }}
.day.vacation {{ background: rgba(60,180,60,0.15); }}
.day.professional_day {{ background: rgba(128,0,160,0.12); }}
.day.orientation_day {{ background: rgba(0,168,150,0.15); }}
.day.snow_day {{ background: rgba(150,90,40,0.15); }}
{band_css}#info {{ position: fixed; right: 10px; top: 10px; background: #fff; padding: 10px; border: 1px solid #ddd; max-width: 300px; }}
#failures {{ color: #a00; }}
</style>
</head>
<body>
<div id='info'>Click a day to inspect.</div>
<ul id='failures'>{failures}</ul>
{months}
<script>
const info = document.getElementById('info');
for (const el of document.querySelectorAll('.day')) {{
  el.addEventListener('click', () => {{
    info.innerHTML = `date: ${{el.dataset.date}}<br/>type: ${{el.dataset.type}}<br/>flags: ${{el.dataset.flags}}<br/>band: ${{el.dataset.band}}<br/>star: ${{el.dataset.star}}<br/>asterisk: ${{el.dataset.asterisk}}<br/>day number: ${{el.dataset.daynum}}<br/>text: ${{el.dataset.text}}`;
  }});
}}
</script>
</body>
</html>"#,
            band_css = band_css,
            failures = failures_html,
            months = months_html,
        );
        let path = self.out_dir.join("calendar.html");
        fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
