use super::Sigmoid;

#[derive(Clone, Debug, PartialEq)]
pub enum ActFn {
    Sigmoid(Sigmoid),
}
use ActFn::*;

impl ActFn {
    pub fn sigmoid(amp: f64) -> Self {
        Sigmoid(Sigmoid::new(amp))
    }

    pub fn f(&self, x: f64) -> f64 {
        match self {
            Sigmoid(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f64) -> f64 {
        match self {
            Sigmoid(a) => a.df(x),
        }
    }
}
