//! Utilities.
use ndarray::{Array1, Array2};
use ordered_float::OrderedFloat;
use std::collections::VecDeque;

/// Pushes `item` to the back, evicting from the front beyond `capacity`.
pub(crate) fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while buf.len() >= capacity {
        buf.pop_front();
    }
    buf.push_back(item);
}

/// Median, averaging the two middle values for an even number of values.
pub(crate) fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by_key(|&v| OrderedFloat(v));
    let m = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[m - 1] + values[m]) / 2.0)
    } else {
        Some(values[m])
    }
}

/// Stacks vectors of the same length as the rows of a matrix.
pub(crate) fn stack_rows(rows: &[Array1<f32>]) -> Array2<f32> {
    let dim = rows.first().map_or(0, |r| r.len());
    Array2::from_shape_fn((rows.len(), dim), |(i, j)| rows[i][j])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_push_bounded() {
        let mut buf = VecDeque::new();
        for i in 0..5 {
            push_bounded(&mut buf, i, 3);
        }
        assert_eq!(buf, VecDeque::from(vec![2, 3, 4]));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_stack_rows() {
        let m = stack_rows(&[array![1.0, 2.0], array![3.0, 4.0]]);
        assert_eq!(m, array![[1.0, 2.0], [3.0, 4.0]]);
    }
}
