use super::{
    AccessMethod, SizeMismatchErr,
    access_method::{check_dim, parse_parts, write_parts},
};
use crate::storage::Record;

/// A key's weights, first and second moments and the amount of updates it received.
#[derive(Debug, Clone, PartialEq)]
pub struct AdamParam {
    pub step: u32,
    pub weights: Vec<f32>,
    pub m: Vec<f32>,
    pub v: Vec<f32>,
}

impl Record for AdamParam {
    fn write_record(&self, out: &mut String) {
        self.step.write_record(out);
        out.push_str(" | ");
        write_parts(&[&self.weights, &self.m, &self.v], out);
    }

    fn parse_record(s: &str) -> Option<Self> {
        let (step, rest) = s.split_once('|')?;
        let mut parts = parse_parts(rest, 3)?.into_iter();

        Some(Self {
            step: u32::parse_record(step)?,
            weights: parts.next()?,
            m: parts.next()?,
            v: parts.next()?,
        })
    }
}

/// Adam with bias correction tracked per key, keys updated less often get larger corrections.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    dim: usize,
}

impl Adam {
    /// Creates a new `Adam` access method.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    /// * `dim` - The length of every key's parameter vector.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32, dim: usize) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            dim,
        }
    }
}

impl AccessMethod for Adam {
    type Param = AdamParam;
    type Value = Vec<f32>;
    type Grad = Vec<f32>;

    fn init_param(&self) -> AdamParam {
        AdamParam {
            step: 0,
            weights: vec![0.; self.dim],
            m: vec![0.; self.dim],
            v: vec![0.; self.dim],
        }
    }

    fn get_pull_value(&self, param: &AdamParam) -> Vec<f32> {
        param.weights.clone()
    }

    fn check_grad(&self, grad: &Vec<f32>) -> Result<(), SizeMismatchErr> {
        check_dim(self.dim, grad)
    }

    fn check_param(&self, param: &AdamParam) -> Result<(), SizeMismatchErr> {
        [&param.weights, &param.m, &param.v]
            .into_iter()
            .try_for_each(|part| check_dim(self.dim, part))
    }

    fn apply_push_value(&self, param: &mut AdamParam, grad: &Vec<f32>) {
        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        param.step = param.step.saturating_add(1);
        let t = param.step as i32;

        let bc1 = 1. - b1.powi(t);
        let bc2 = 1. - b2.powi(t);
        let step_size = lr * (bc2.sqrt() / bc1);

        let AdamParam { weights, m, v, .. } = param;

        weights
            .iter_mut()
            .zip(grad)
            .zip(m.iter_mut())
            .zip(v.iter_mut())
            .for_each(|(((p, g), m), v)| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g.powi(2);
                *p -= step_size * *m / (v.sqrt() + eps);
            });
    }
}
