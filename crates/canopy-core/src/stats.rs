use serde::{Deserialize, Serialize};

/// Mean, population standard deviation and sample count of one value set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    #[serde(rename = "standardDeviation")]
    pub std_dev: f64,
    #[serde(rename = "sampleCount")]
    pub count: usize,
}

/// Summarise the present values of `values`.
///
/// Mean and standard deviation are taken over exactly the same set, and the
/// deviation divides by the sample count. Returns `None` when nothing is
/// present.
pub fn summarize<I>(values: I) -> Option<Summary>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let valid: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }
    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let var = valid.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(Summary { mean, std_dev: var.sqrt(), count: valid.len() })
}

/// Round to one decimal place, as percentages are reported.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn summary_over_present_values_only() {
        let s = summarize([Some(-5.0), Some(-7.0), None]).unwrap();
        assert_relative_eq!(s.mean, -6.0);
        assert_relative_eq!(s.std_dev, 1.0);
        assert_eq!(s.count, 2);
    }

    #[test]
    fn textbook_population_formula() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let s = summarize(vals.iter().map(|&v| Some(v))).unwrap();
        assert_relative_eq!(s.mean, 5.0);
        assert_relative_eq!(s.std_dev, 2.0);
        assert_eq!(s.count, 8);
    }

    #[test]
    fn empty_or_all_null_is_none() {
        assert!(summarize(std::iter::empty()).is_none());
        assert!(summarize([None, None]).is_none());
    }

    #[test]
    fn single_value_has_zero_spread() {
        let s = summarize([Some(3.5)]).unwrap();
        assert_relative_eq!(s.mean, 3.5);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn rounding_to_one_decimal() {
        assert_eq!(round1(66.666), 66.7);
        assert_eq!(round1(60.0), 60.0);
        assert_eq!(round1(33.333), 33.3);
    }
}
