use crate::core::geometry::PixelRect;

/// Boundaries `origin + i * extent / n` for `i` in `0..=n`; consecutive
/// boundaries differ by at most one pixel from each other.
fn boundaries(origin: u32, extent: u32, n: usize) -> Vec<u32> {
    (0..=n as u64)
        .map(|i| origin + (i * extent as u64 / n as u64) as u32)
        .collect()
}

/// Splits `rect` into `rows × cols` disjoint cells that cover it exactly,
/// in row-major order.
pub fn partition(rect: PixelRect, rows: usize, cols: usize) -> Vec<(usize, usize, PixelRect)> {
    if rows == 0 || cols == 0 {
        return Vec::new();
    }
    let ys = boundaries(rect.y, rect.height, rows);
    let xs = boundaries(rect.x, rect.width, cols);

    let mut cells = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            cells.push((
                row,
                col,
                PixelRect::new(xs[col], ys[row], xs[col + 1] - xs[col], ys[row + 1] - ys[row]),
            ));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_tiles(rect: PixelRect, rows: usize, cols: usize) {
        let cells = partition(rect, rows, cols);
        assert_eq!(cells.len(), rows * cols);

        let total: u64 = cells.iter().map(|(_, _, r)| r.area()).sum();
        assert_eq!(total, rect.area());
        for (i, (_, _, a)) in cells.iter().enumerate() {
            assert!(!a.is_empty());
            for (_, _, b) in cells.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
        let hull = cells
            .iter()
            .map(|(_, _, r)| *r)
            .reduce(|acc, r| acc.union(&r))
            .unwrap();
        assert_eq!(hull, rect);
    }

    #[test]
    fn tiles_every_bounded_shape() {
        for (rows, cols) in [(1, 1), (1, 7), (3, 5), (6, 7), (12, 14)] {
            assert_tiles(PixelRect::new(13, 7, 701, 599), rows, cols);
        }
    }

    #[test]
    fn row_major_indices() {
        let cells = partition(PixelRect::new(0, 0, 70, 60), 2, 7);
        assert_eq!((cells[0].0, cells[0].1), (0, 0));
        assert_eq!((cells[7].0, cells[7].1), (1, 0));
        assert_eq!(cells[8].2, PixelRect::new(10, 30, 10, 30));
    }
}
