use crate::error::BuildError;
use crate::ops::spec::{ParamMode, Parameter};

/// Marker returned by `number_of_arguments_max` for varargs functions.
pub const VAR_ARGS: isize = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` for varargs.
    pub max: Option<usize>,
}

impl Arity {
    pub fn from_params(params: &[Parameter]) -> Self {
        let min = params.iter().filter(|p| p.is_required()).count();
        let max = if params.iter().any(Parameter::is_var_args) {
            None
        } else {
            Some(params.len())
        };
        Self { min, max }
    }

    #[inline]
    pub const fn is_var_args(self) -> bool {
        self.max.is_none()
    }

    #[inline]
    pub fn accepts(self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    pub fn check(self, name: &str, actual: usize) -> Result<(), BuildError> {
        if self.accepts(actual) {
            return Ok(());
        }
        Err(BuildError::InvalidArity {
            name: name.to_string(),
            expected: self.describe(),
            actual,
        })
    }

    pub fn describe(self) -> String {
        match self.max {
            None => format!("at least {}", self.min),
            Some(max) if max == self.min => self.min.to_string(),
            Some(max) => format!("{}~{}", self.min, max),
        }
    }
}

/// Checks descriptor ordering: optional parameters only after required ones,
/// and at most one varargs parameter, in last position.
pub fn validate_parameters(params: &[Parameter]) -> Result<(), String> {
    let mut seen_optional = false;
    for (idx, param) in params.iter().enumerate() {
        match param.mode {
            ParamMode::Required if seen_optional => {
                return Err(format!(
                    "required parameter `{}` follows an optional one",
                    param.name
                ));
            }
            ParamMode::Required => {}
            ParamMode::Optional { .. } => seen_optional = true,
            ParamMode::VarArgs if idx + 1 != params.len() => {
                return Err(format!(
                    "varargs parameter `{}` must be the last parameter",
                    param.name
                ));
            }
            ParamMode::VarArgs => seen_optional = true,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResultKind;

    const COUNT: Parameter = Parameter::required("count", ResultKind::Double, "");
    const VALUE: Parameter = Parameter::required("value", ResultKind::Double, "");
    const STEPS: Parameter = Parameter::optional("steps", ResultKind::Double, 1.0, "");
    const REST: Parameter = Parameter::varargs("rest", ResultKind::Double, "");

    #[test]
    fn arity_counts_required_and_optional() {
        let arity = Arity::from_params(&[COUNT, VALUE, STEPS]);
        assert_eq!(arity, Arity { min: 2, max: Some(3) });
        assert!(arity.accepts(2));
        assert!(arity.accepts(3));
        assert!(!arity.accepts(1));
        assert!(!arity.accepts(4));
        assert_eq!(arity.describe(), "2~3");
    }

    #[test]
    fn varargs_arity_is_unbounded() {
        let arity = Arity::from_params(&[VALUE, REST]);
        assert!(arity.is_var_args());
        assert!(arity.accepts(100));
        assert!(!arity.accepts(0));
        assert_eq!(arity.describe(), "at least 1");
    }

    #[test]
    fn check_reports_expected_arity() {
        let err = Arity::from_params(&[COUNT, VALUE])
            .check("stable", 1)
            .expect_err("too few args");
        assert!(matches!(
            err,
            BuildError::InvalidArity { ref expected, actual: 1, .. } if expected == "2"
        ));
    }

    #[test]
    fn required_after_optional_is_rejected() {
        assert!(validate_parameters(&[COUNT, STEPS]).is_ok());
        assert!(validate_parameters(&[STEPS, COUNT]).is_err());
        assert!(validate_parameters(&[REST, VALUE]).is_err());
        assert!(validate_parameters(&[COUNT, REST, REST]).is_err());
    }
}
