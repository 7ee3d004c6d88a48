//! Known PromQL functions and their signatures

use super::ast::ValueType;

/// Signature of a built-in function
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub arg_types: &'static [ValueType],
    /// Number of trailing arguments that may be omitted
    pub optional: usize,
    /// Whether the last argument may repeat
    pub variadic: bool,
    pub return_type: ValueType,
}

impl Function {
    pub fn min_args(&self) -> usize {
        self.arg_types.len() - self.optional
    }

    /// `None` when the argument list is unbounded
    pub fn max_args(&self) -> Option<usize> {
        if self.variadic {
            None
        } else {
            Some(self.arg_types.len())
        }
    }

    /// Expected type of the argument at `index`
    pub fn arg_type(&self, index: usize) -> Option<ValueType> {
        self.arg_types
            .get(index)
            .or_else(|| self.variadic.then(|| self.arg_types.last()).flatten())
            .copied()
    }
}

use ValueType::{Matrix as M, Scalar as S, String as Str, Vector as V};

const fn f(name: &'static str, arg_types: &'static [ValueType], return_type: ValueType) -> Function {
    Function {
        name,
        arg_types,
        optional: 0,
        variadic: false,
        return_type,
    }
}

const fn opt(
    name: &'static str,
    arg_types: &'static [ValueType],
    optional: usize,
    return_type: ValueType,
) -> Function {
    Function {
        name,
        arg_types,
        optional,
        variadic: false,
        return_type,
    }
}

const FUNCTIONS: &[Function] = &[
    f("abs", &[V], V),
    f("absent", &[V], V),
    f("absent_over_time", &[M], V),
    f("acos", &[V], V),
    f("acosh", &[V], V),
    f("asin", &[V], V),
    f("asinh", &[V], V),
    f("atan", &[V], V),
    f("atanh", &[V], V),
    f("avg_over_time", &[M], V),
    f("ceil", &[V], V),
    f("changes", &[M], V),
    f("clamp", &[V, S, S], V),
    f("clamp_max", &[V, S], V),
    f("clamp_min", &[V, S], V),
    f("cos", &[V], V),
    f("cosh", &[V], V),
    f("count_over_time", &[M], V),
    opt("day_of_month", &[V], 1, V),
    opt("day_of_week", &[V], 1, V),
    opt("day_of_year", &[V], 1, V),
    opt("days_in_month", &[V], 1, V),
    f("deg", &[V], V),
    f("delta", &[M], V),
    f("deriv", &[M], V),
    f("exp", &[V], V),
    f("floor", &[V], V),
    f("histogram_quantile", &[S, V], V),
    f("holt_winters", &[M, S, S], V),
    opt("hour", &[V], 1, V),
    f("idelta", &[M], V),
    f("increase", &[M], V),
    f("irate", &[M], V),
    Function {
        name: "label_join",
        arg_types: &[V, Str, Str, Str],
        optional: 1,
        variadic: true,
        return_type: V,
    },
    f("label_replace", &[V, Str, Str, Str, Str], V),
    f("last_over_time", &[M], V),
    f("ln", &[V], V),
    f("log10", &[V], V),
    f("log2", &[V], V),
    f("max_over_time", &[M], V),
    f("min_over_time", &[M], V),
    opt("minute", &[V], 1, V),
    opt("month", &[V], 1, V),
    f("pi", &[], S),
    f("predict_linear", &[M, S], V),
    f("present_over_time", &[M], V),
    f("quantile_over_time", &[S, M], V),
    f("rad", &[V], V),
    f("rate", &[M], V),
    f("resets", &[M], V),
    opt("round", &[V, S], 1, V),
    f("scalar", &[V], S),
    f("sgn", &[V], V),
    f("sin", &[V], V),
    f("sinh", &[V], V),
    f("sort", &[V], V),
    f("sort_desc", &[V], V),
    f("sqrt", &[V], V),
    f("stddev_over_time", &[M], V),
    f("stdvar_over_time", &[M], V),
    f("sum_over_time", &[M], V),
    f("tan", &[V], V),
    f("tanh", &[V], V),
    f("time", &[], S),
    f("timestamp", &[V], V),
    f("vector", &[S], V),
    opt("year", &[V], 1, V),
];

/// Look up a function by name
pub fn lookup(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let rate = lookup("rate").unwrap();
        assert_eq!(rate.min_args(), 1);
        assert_eq!(rate.max_args(), Some(1));
        assert_eq!(rate.arg_type(0), Some(ValueType::Matrix));
        assert!(lookup("no_such_function").is_none());
    }

    #[test]
    fn test_optional_arguments() {
        let round = lookup("round").unwrap();
        assert_eq!(round.min_args(), 1);
        assert_eq!(round.max_args(), Some(2));

        let hour = lookup("hour").unwrap();
        assert_eq!(hour.min_args(), 0);
    }

    #[test]
    fn test_variadic_arguments() {
        let join = lookup("label_join").unwrap();
        assert_eq!(join.min_args(), 3);
        assert_eq!(join.max_args(), None);
        assert_eq!(join.arg_type(7), Some(ValueType::String));
    }
}
