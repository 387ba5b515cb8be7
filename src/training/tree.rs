//! Second-order regression tree growth for one boosting round

use rayon::prelude::*;

use crate::classifier::{GbmParams, RegressionTree, TreeNode};

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows one tree against the gradients and hessians of the current round
pub(crate) struct TreeBuilder<'a> {
    /// Column-major feature values, `columns[feature][row]`
    pub columns: &'a [Vec<f64>],
    pub gradients: &'a [f64],
    pub hessians: &'a [f64],
    pub params: &'a GbmParams,
    /// Features this tree may split on, ascending
    pub features: &'a [usize],
}

impl<'a> TreeBuilder<'a> {
    pub fn build(&self, rows: &[usize]) -> RegressionTree {
        let mut nodes = Vec::new();
        self.grow(&mut nodes, rows, 0);
        RegressionTree { nodes }
    }

    /// Appends the subtree for `rows` and returns the index of its root
    fn grow(&self, nodes: &mut Vec<TreeNode>, rows: &[usize], depth: usize) -> usize {
        let index = nodes.len();
        let (g, h) = self.totals(rows);
        nodes.push(TreeNode::Leaf {
            value: self.leaf_value(g, h),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return index;
        }
        let Some(split) = self.best_split(rows, g, h) else {
            return index;
        };

        let column = &self.columns[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&row| column[row] < split.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return index;
        }

        let left = self.grow(nodes, &left_rows, depth + 1);
        let right = self.grow(nodes, &right_rows, depth + 1);
        nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn totals(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &row| {
            (g + self.gradients[row], h + self.hessians[row])
        })
    }

    /// Newton step shrunk by the learning rate
    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.reg_lambda) * self.params.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    /// Highest-gain split over all allowed features; ties go to the lower feature index
    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        self.features
            .par_iter()
            .filter_map(|&feature| self.best_split_for(feature, rows, g, h))
            .reduce_with(|a, b| {
                if b.gain > a.gain || (b.gain == a.gain && b.feature < a.feature) {
                    b
                } else {
                    a
                }
            })
    }

    /// Exact greedy scan over the sorted values of one feature
    fn best_split_for(&self, feature: usize, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let column = &self.columns[feature];
        let mut sorted: Vec<(f64, f64, f64)> = rows
            .iter()
            .map(|&row| (column[row], self.gradients[row], self.hessians[row]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let parent = self.score(g, h);
        let mut best: Option<SplitCandidate> = None;
        let (mut gl, mut hl) = (0.0, 0.0);

        for pair in sorted.windows(2) {
            let (value, grad, hess) = pair[0];
            let next = pair[1].0;
            gl += grad;
            hl += hess;
            if value == next {
                continue;
            }

            let (gr, hr) = (g - gl, h - hl);
            if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                continue;
            }

            let gain =
                0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent) - self.params.gamma;
            if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: value + (next - value) / 2.0,
                    gain,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GbmParams {
        GbmParams {
            max_depth: 2,
            learning_rate: 1.0,
            min_child_weight: 0.0,
            reg_lambda: 0.0,
            ..GbmParams::default()
        }
    }

    #[test]
    fn test_splits_on_informative_feature() {
        // feature 1 separates the gradients, feature 0 is constant
        let columns = vec![vec![1.0; 4], vec![1.0, 2.0, 3.0, 4.0]];
        let gradients = [-0.5, -0.5, 0.5, 0.5];
        let hessians = [0.25; 4];
        let params = params();
        let builder = TreeBuilder {
            columns: &columns,
            gradients: &gradients,
            hessians: &hessians,
            params: &params,
            features: &[0, 1],
        };

        let tree = builder.build(&[0, 1, 2, 3]);
        match &tree.nodes[0] {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 1);
                assert_eq!(*threshold, 2.5);
            }
            other => panic!("expected a split, got {:?}", other),
        }
        assert_eq!(tree.predict(&[1.0, 1.0]), 2.0);
        assert_eq!(tree.predict(&[1.0, 4.0]), -2.0);
    }

    #[test]
    fn test_pure_node_stays_leaf() {
        let columns = vec![vec![1.0, 2.0, 3.0]];
        let gradients = [0.5; 3];
        let hessians = [0.25; 3];
        let params = GbmParams {
            learning_rate: 0.1,
            ..params()
        };
        let builder = TreeBuilder {
            columns: &columns,
            gradients: &gradients,
            hessians: &hessians,
            params: &params,
            features: &[0],
        };

        let tree = builder.build(&[0, 1, 2]);
        assert_eq!(tree.nodes.len(), 1);
        assert!((tree.predict(&[2.0]) - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_respects_max_depth() {
        let columns = vec![(0..16).map(f64::from).collect::<Vec<_>>()];
        let gradients: Vec<f64> = (0..16).map(|i| if i % 2 == 0 { -0.5 } else { 0.5 }).collect();
        let hessians = vec![0.25; 16];
        let params = params();
        let builder = TreeBuilder {
            columns: &columns,
            gradients: &gradients,
            hessians: &hessians,
            params: &params,
            features: &[0],
        };

        let rows: Vec<usize> = (0..16).collect();
        assert!(builder.build(&rows).depth() <= 2);
    }
}
