use super::{AccessMethod, SizeMismatchErr, access_method::check_dim};

/// Dense parameters updated by `param -= learning_rate * grad`.
#[derive(Debug)]
pub struct GradientDescent {
    learning_rate: f32,
    dim: usize,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` access method.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `dim` - The length of every key's parameter vector.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32, dim: usize) -> Self {
        Self { learning_rate, dim }
    }
}

impl AccessMethod for GradientDescent {
    type Param = Vec<f32>;
    type Value = Vec<f32>;
    type Grad = Vec<f32>;

    fn init_param(&self) -> Vec<f32> {
        vec![0.; self.dim]
    }

    fn get_pull_value(&self, param: &Vec<f32>) -> Vec<f32> {
        param.clone()
    }

    fn check_grad(&self, grad: &Vec<f32>) -> Result<(), SizeMismatchErr> {
        check_dim(self.dim, grad)
    }

    fn check_param(&self, param: &Vec<f32>) -> Result<(), SizeMismatchErr> {
        check_dim(self.dim, param)
    }

    fn apply_push_value(&self, param: &mut Vec<f32>, grad: &Vec<f32>) {
        let lr = self.learning_rate;

        for (p, g) in param.iter_mut().zip(grad) {
            *p -= lr * g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descends_along_gradient() {
        let method = GradientDescent::new(0.5, 2);
        let mut param = method.init_param();

        method.apply_push_value(&mut param, &vec![1.0, -2.0]);
        assert_eq!(param, [-0.5, 1.0]);
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let method = GradientDescent::new(0.5, 3);
        assert_eq!(
            method.check_grad(&vec![1.0]),
            Err(SizeMismatchErr {
                expected: 3,
                got: 1
            })
        );
    }
}
