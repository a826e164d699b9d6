use serde::{Deserialize, Serialize};

/// Bound applied to sigmoid inputs. Beyond it `exp` either overflows or the
/// result rounds to exactly 0 or 1 in f64.
pub const SIGMOID_CLIP: f64 = 30.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, z: f64) -> f64 {
        match self {
            Activation::Relu => relu(z),
            Activation::Sigmoid => sigmoid(z),
        }
    }

    pub fn derivative(&self, z: f64) -> f64 {
        match self {
            Activation::Relu => relu_derivative(z),
            Activation::Sigmoid => sigmoid_derivative(z),
        }
    }
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z.clamp(-SIGMOID_CLIP, SIGMOID_CLIP)).exp())
}

pub fn sigmoid_derivative(z: f64) -> f64 {
    let s = sigmoid(z);
    s * (1.0 - s)
}

pub fn relu(z: f64) -> f64 {
    z.max(0.0)
}

pub fn relu_derivative(z: f64) -> f64 {
    if z > 0.0 {
        1.0
    } else {
        0.0
    }
}
