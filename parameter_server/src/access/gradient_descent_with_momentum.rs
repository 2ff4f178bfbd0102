use super::{
    AccessMethod, SizeMismatchErr,
    access_method::{check_dim, parse_parts, write_parts},
};
use crate::storage::Record;

/// A key's weights together with its velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumParam {
    pub weights: Vec<f32>,
    pub velocity: Vec<f32>,
}

impl Record for MomentumParam {
    fn write_record(&self, out: &mut String) {
        write_parts(&[&self.weights, &self.velocity], out);
    }

    fn parse_record(s: &str) -> Option<Self> {
        let mut parts = parse_parts(s, 2)?.into_iter();

        Some(Self {
            weights: parts.next()?,
            velocity: parts.next()?,
        })
    }
}

#[derive(Debug)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    dim: usize,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` access method.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    /// * `dim` - The length of every key's parameter vector.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(learning_rate: f32, momentum: f32, dim: usize) -> Self {
        Self {
            learning_rate,
            momentum,
            dim,
        }
    }
}

impl AccessMethod for GradientDescentWithMomentum {
    type Param = MomentumParam;
    type Value = Vec<f32>;
    type Grad = Vec<f32>;

    fn init_param(&self) -> MomentumParam {
        MomentumParam {
            weights: vec![0.; self.dim],
            velocity: vec![0.; self.dim],
        }
    }

    fn get_pull_value(&self, param: &MomentumParam) -> Vec<f32> {
        param.weights.clone()
    }

    fn check_grad(&self, grad: &Vec<f32>) -> Result<(), SizeMismatchErr> {
        check_dim(self.dim, grad)
    }

    fn check_param(&self, param: &MomentumParam) -> Result<(), SizeMismatchErr> {
        check_dim(self.dim, &param.weights)?;
        check_dim(self.dim, &param.velocity)
    }

    fn apply_push_value(&self, param: &mut MomentumParam, grad: &Vec<f32>) {
        let lr = self.learning_rate;
        let mu = self.momentum;

        param
            .weights
            .iter_mut()
            .zip(grad)
            .zip(param.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                *v = (mu * *v) + g;
                *p -= lr * *v;
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_accumulates() {
        let method = GradientDescentWithMomentum::new(1.0, 0.5, 1);
        let mut param = method.init_param();

        method.apply_push_value(&mut param, &vec![1.0]);
        assert_eq!(param.velocity, [1.0]);
        assert_eq!(param.weights, [-1.0]);

        method.apply_push_value(&mut param, &vec![1.0]);
        assert_eq!(param.velocity, [1.5]);
        assert_eq!(param.weights, [-2.5]);
        assert_eq!(method.get_pull_value(&param), [-2.5]);
    }

    #[test]
    fn test_param_checks_both_vectors() {
        let method = GradientDescentWithMomentum::new(1.0, 0.5, 2);
        assert_eq!(method.check_param(&method.init_param()), Ok(()));

        let short_velocity = MomentumParam {
            weights: vec![1.0, 2.0],
            velocity: vec![0.0],
        };
        assert_eq!(
            method.check_param(&short_velocity),
            Err(SizeMismatchErr {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_record_keeps_both_vectors() {
        let param = MomentumParam {
            weights: vec![0.25, -1.0],
            velocity: vec![3.0, 0.0],
        };

        let mut out = String::new();
        param.write_record(&mut out);

        assert_eq!(out, "0.25 -1 | 3 0");
        assert_eq!(MomentumParam::parse_record(&out), Some(param));
    }
}
