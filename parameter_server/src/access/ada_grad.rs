use super::{
    AccessMethod, SizeMismatchErr,
    access_method::{check_dim, parse_parts, write_parts},
};
use crate::storage::Record;

/// A key's weights together with the running sum of its squared gradients.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaGradParam {
    pub weights: Vec<f32>,
    pub grad_sq: Vec<f32>,
}

impl Record for AdaGradParam {
    fn write_record(&self, out: &mut String) {
        write_parts(&[&self.weights, &self.grad_sq], out);
    }

    fn parse_record(s: &str) -> Option<Self> {
        let mut parts = parse_parts(s, 2)?.into_iter();

        Some(Self {
            weights: parts.next()?,
            grad_sq: parts.next()?,
        })
    }
}

/// Per coordinate adaptive learning rates, rarely seen features keep taking large steps.
#[derive(Debug)]
pub struct AdaGrad {
    learning_rate: f32,
    epsilon: f32,
    dim: usize,
}

impl AdaGrad {
    pub fn new(learning_rate: f32, epsilon: f32, dim: usize) -> Self {
        Self {
            learning_rate,
            epsilon,
            dim,
        }
    }
}

impl AccessMethod for AdaGrad {
    type Param = AdaGradParam;
    type Value = Vec<f32>;
    type Grad = Vec<f32>;

    fn init_param(&self) -> AdaGradParam {
        AdaGradParam {
            weights: vec![0.; self.dim],
            grad_sq: vec![0.; self.dim],
        }
    }

    fn get_pull_value(&self, param: &AdaGradParam) -> Vec<f32> {
        param.weights.clone()
    }

    fn check_grad(&self, grad: &Vec<f32>) -> Result<(), SizeMismatchErr> {
        check_dim(self.dim, grad)
    }

    fn check_param(&self, param: &AdaGradParam) -> Result<(), SizeMismatchErr> {
        check_dim(self.dim, &param.weights)?;
        check_dim(self.dim, &param.grad_sq)
    }

    fn apply_push_value(&self, param: &mut AdaGradParam, grad: &Vec<f32>) {
        let lr = self.learning_rate;
        let eps = self.epsilon;

        param
            .weights
            .iter_mut()
            .zip(grad)
            .zip(param.grad_sq.iter_mut())
            .for_each(|((p, g), s)| {
                *s += g * g;
                *p -= lr * g / (s.sqrt() + eps);
            });
    }
}
