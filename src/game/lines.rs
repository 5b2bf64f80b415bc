//! 获胜线枚举。标准棋盘的结果只计算一次，之后在整个进程中复用。

use once_cell::sync::Lazy;

use super::state::{Position, WinLine, BOARD_SIZE};

/// 标准 3×3×3 棋盘的 49 条获胜线，顺序固定。
static WIN_LINES: Lazy<Vec<WinLine>> = Lazy::new(|| generate_win_lines(BOARD_SIZE));

/// 与 `WIN_LINES` 一一对应的格子下标，供搜索热路径使用。
static LINE_INDICES: Lazy<Vec<[usize; BOARD_SIZE]>> = Lazy::new(|| {
    WIN_LINES
        .iter()
        .map(|line| {
            let mut indices = [0usize; BOARD_SIZE];
            for (slot, position) in indices.iter_mut().zip(line.positions()) {
                *slot = position.index().unwrap_or_default();
            }
            indices
        })
        .collect()
});

pub fn win_lines() -> &'static [WinLine] {
    &WIN_LINES
}

pub(crate) fn line_indices() -> &'static [[usize; BOARD_SIZE]] {
    &LINE_INDICES
}

/// 任意边长的获胜线，共 `3n² + 6n + 4` 条。
///
/// 顺序：沿 x、y、z 轴的直线，XY、XZ、YZ 平面对角线，最后是四条体对角线。
pub fn generate_win_lines(size: usize) -> Vec<WinLine> {
    let n = size as i32;
    let far = n - 1;
    let span = 0..n;
    let mut lines = Vec::with_capacity(3 * size * size + 6 * size + 4);

    let line = |f: &dyn Fn(i32) -> Position| WinLine::new(span.clone().map(f).collect());

    for y in 0..n {
        for z in 0..n {
            lines.push(line(&|i| Position::new(i, y, z)));
        }
    }
    for x in 0..n {
        for z in 0..n {
            lines.push(line(&|i| Position::new(x, i, z)));
        }
    }
    for x in 0..n {
        for y in 0..n {
            lines.push(line(&|i| Position::new(x, y, i)));
        }
    }

    for z in 0..n {
        lines.push(line(&|i| Position::new(i, i, z)));
        lines.push(line(&|i| Position::new(i, far - i, z)));
    }
    for y in 0..n {
        lines.push(line(&|i| Position::new(i, y, i)));
        lines.push(line(&|i| Position::new(i, y, far - i)));
    }
    for x in 0..n {
        lines.push(line(&|i| Position::new(x, i, i)));
        lines.push(line(&|i| Position::new(x, i, far - i)));
    }

    lines.push(line(&|i| Position::new(i, i, i)));
    lines.push(line(&|i| Position::new(i, i, far - i)));
    lines.push(line(&|i| Position::new(i, far - i, i)));
    lines.push(line(&|i| Position::new(i, far - i, far - i)));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn standard_board_has_49_distinct_lines() {
        let lines = win_lines();
        assert_eq!(lines.len(), 49);
        assert!(lines.iter().all(|line| line.len() == BOARD_SIZE));

        let distinct: HashSet<_> = lines.iter().collect();
        assert_eq!(distinct.len(), 49, "no line should be listed twice");
    }

    #[test]
    fn every_line_is_straight() {
        for line in win_lines() {
            let p = line.positions();
            let step = (p[1].x - p[0].x, p[1].y - p[0].y, p[1].z - p[0].z);
            assert_ne!(step, (0, 0, 0));
            assert_eq!((p[2].x - p[1].x, p[2].y - p[1].y, p[2].z - p[1].z), step);
            assert!(p.iter().all(Position::in_bounds));
        }
    }

    #[test]
    fn centre_lies_on_thirteen_lines() {
        let centre = Position::new(1, 1, 1);
        let through_centre = win_lines().iter().filter(|line| line.contains(&centre)).count();
        assert_eq!(through_centre, 13);
    }

    #[test]
    fn space_diagonals_come_last() {
        let lines = win_lines();
        assert_eq!(
            lines[45].positions(),
            &[Position::new(0, 0, 0), Position::new(1, 1, 1), Position::new(2, 2, 2)]
        );
        assert_eq!(
            lines[48].positions(),
            &[Position::new(0, 2, 2), Position::new(1, 1, 1), Position::new(2, 0, 0)]
        );
    }

    #[test]
    fn larger_boards_follow_line_count_formula() {
        for size in 3..=8 {
            let lines = generate_win_lines(size);
            assert_eq!(lines.len(), 3 * size * size + 6 * size + 4, "size {size}");
            assert!(lines.iter().all(|line| line.len() == size));
        }
    }

    #[test]
    fn line_indices_match_positions() {
        for (line, indices) in win_lines().iter().zip(line_indices()) {
            for (position, index) in line.positions().iter().zip(indices) {
                assert_eq!(position.index(), Some(*index));
            }
        }
    }

    #[test]
    fn repeated_calls_return_the_same_set() {
        let first = win_lines().as_ptr();
        let second = win_lines().as_ptr();
        assert_eq!(first, second);
        assert_eq!(win_lines(), generate_win_lines(BOARD_SIZE).as_slice());
    }
}
