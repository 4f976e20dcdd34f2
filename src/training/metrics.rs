//! Evaluation metrics for the home-win classifier

use std::fmt;

/// Accuracy of boolean predictions
pub fn accuracy(y_true: &[bool], y_pred: &[bool]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Area under the ROC curve from the rank-sum statistic, ties averaged.
/// None unless both classes are present.
pub fn roc_auc(y_true: &[bool], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|t| **t).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based; tied block shares the mean rank
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(y_true)
        .filter(|(_, t)| **t)
        .map(|(r, _)| r)
        .sum();
    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn for_class(y_true: &[bool], y_pred: &[bool], class: bool) -> Self {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == class, p == class) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Per-class report with macro and weighted averages
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub away_win: ClassMetrics,
    pub home_win: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn new(y_true: &[bool], y_pred: &[bool]) -> Self {
        let away_win = ClassMetrics::for_class(y_true, y_pred, false);
        let home_win = ClassMetrics::for_class(y_true, y_pred, true);
        let total = away_win.support + home_win.support;

        let macro_avg = ClassMetrics {
            precision: (away_win.precision + home_win.precision) / 2.0,
            recall: (away_win.recall + home_win.recall) / 2.0,
            f1: (away_win.f1 + home_win.f1) / 2.0,
            support: total,
        };
        let weight = |a: f64, h: f64| {
            if total == 0 {
                0.0
            } else {
                (a * away_win.support as f64 + h * home_win.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weight(away_win.precision, home_win.precision),
            recall: weight(away_win.recall, home_win.recall),
            f1: weight(away_win.f1, home_win.f1),
            support: total,
        };

        ClassificationReport {
            away_win,
            home_win,
            accuracy: accuracy(y_true, y_pred),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for (name, m) in [("away win", &self.away_win), ("home win", &self.home_win)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

/// Held-out evaluation of home-win probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub n: usize,
    pub accuracy: f64,
    pub roc_auc: Option<f64>,
    pub report: ClassificationReport,
}

impl Evaluation {
    /// Probabilities above 0.5 predict a home win
    pub fn from_probabilities(y_true: &[bool], probabilities: &[f64]) -> Self {
        let y_pred: Vec<bool> = probabilities.iter().map(|p| *p > 0.5).collect();
        Evaluation {
            n: y_true.len(),
            accuracy: accuracy(y_true, &y_pred),
            roc_auc: roc_auc(y_true, probabilities),
            report: ClassificationReport::new(y_true, &y_pred),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Acc: {:.2}% on {} rows", self.accuracy * 100.0, self.n)?;
        match self.roc_auc {
            Some(auc) => write!(f, " | ROC-AUC: {:.4}", auc),
            None => write!(f, " | ROC-AUC: n/a (single class)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[true, false, true, true], &[true, true, true, false]), 0.5);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_roc_auc() {
        let y = [false, false, true, true];
        assert_eq!(roc_auc(&y, &[0.1, 0.4, 0.35, 0.8]), Some(0.75));
        assert_eq!(roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&y, &[0.5, 0.5, 0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[true, true], &[0.2, 0.9]), None);
    }

    #[test]
    fn test_classification_report() {
        let y_true = [true, true, true, false, false];
        let y_pred = [true, true, false, false, true];
        let report = ClassificationReport::new(&y_true, &y_pred);

        assert!((report.home_win.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.home_win.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.away_win.support, 2);
        assert!((report.away_win.precision - 0.5).abs() < 1e-12);
        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 5);

        let text = report.to_string();
        assert!(text.contains("home win"));
        assert!(text.contains("weighted avg"));
    }

    #[test]
    fn test_evaluation_threshold() {
        let eval = Evaluation::from_probabilities(&[true, false], &[0.5, 0.5]);
        assert_eq!(eval.accuracy, 0.5);
        assert_eq!(eval.roc_auc, Some(0.5));
    }
}
