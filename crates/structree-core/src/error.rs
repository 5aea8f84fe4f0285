use thiserror::Error;

/// Fatal precondition violation in rational arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticFault {
    #[error("rational cannot have a zero denominator")]
    ZeroDenominator,

    #[error("division by zero in rational {operation}")]
    DivisionByZero { operation: &'static str },

    #[error("rational {operation} overflowed 64-bit bounds")]
    Overflow { operation: &'static str },
}

/// Failure to parse a rational from text such as `"-3/4"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRationalError {
    #[error("empty rational literal")]
    Empty,

    #[error("invalid integer {component:?} in rational literal {input:?}")]
    InvalidInteger { input: String, component: String },

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticFault),
}
