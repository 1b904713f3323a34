//! Integer and float arithmetic with sprig's lenient operand conversion.
use crate::error::FuncError;
use crate::funcs::{arity, arity_range, at_least, int_arg, to_f64, to_i64, to_str, Library};
use crate::value::{number, Value};


pub(crate) fn register(library: &mut Library) {
    library.add("add", |args| Ok(Value::from(args.iter().map(to_i64).fold(0i64, i64::wrapping_add))));
    library.add("add1", |args| {
        arity("add1", args, 1)?;
        Ok(Value::from(to_i64(&args[0]).wrapping_add(1)))
    });
    library.add("sub", |args| {
        arity("sub", args, 2)?;
        Ok(Value::from(to_i64(&args[0]).wrapping_sub(to_i64(&args[1]))))
    });
    library.add("mul", |args| {
        at_least("mul", args, 1)?;
        Ok(Value::from(args.iter().map(to_i64).fold(1i64, i64::wrapping_mul)))
    });
    library.add("div", |args| {
        arity("div", args, 2)?;
        to_i64(&args[0]).checked_div(to_i64(&args[1]))
            .map(Value::from)
            .ok_or_else(|| FuncError::message("integer divide by zero"))
    });
    library.add("mod", |args| {
        arity("mod", args, 2)?;
        to_i64(&args[0]).checked_rem(to_i64(&args[1]))
            .map(Value::from)
            .ok_or_else(|| FuncError::message("integer divide by zero"))
    });
    library.add("max", |args| {
        at_least("max", args, 1)?;
        Ok(Value::from(args.iter().map(to_i64).max().unwrap_or_default()))
    });
    library.add("min", |args| {
        at_least("min", args, 1)?;
        Ok(Value::from(args.iter().map(to_i64).min().unwrap_or_default()))
    });

    library.add("addf", |args| Ok(number(args.iter().map(to_f64).sum())));
    library.add("subf", |args| {
        at_least("subf", args, 1)?;
        Ok(number(args[1..].iter().map(to_f64).fold(to_f64(&args[0]), |a, b| a - b)))
    });
    library.add("mulf", |args| {
        at_least("mulf", args, 1)?;
        Ok(number(args[1..].iter().map(to_f64).fold(to_f64(&args[0]), |a, b| a * b)))
    });
    library.add("divf", |args| {
        at_least("divf", args, 1)?;
        let mut quotient = to_f64(&args[0]);
        for divisor in args[1..].iter().map(to_f64) {
            if divisor == 0.0 {
                return Err(FuncError::message("decimal division by 0"));
            }
            quotient /= divisor;
        }
        Ok(number(quotient))
    });

    library.add("floor", |args| {
        arity("floor", args, 1)?;
        Ok(number(to_f64(&args[0]).floor()))
    });
    library.add("ceil", |args| {
        arity("ceil", args, 1)?;
        Ok(number(to_f64(&args[0]).ceil()))
    });
    library.add("round", |args| {
        arity_range("round", args, 2, 3)?;
        let round_on = args.get(2).map(to_f64).unwrap_or(0.5);
        Ok(number(round(to_f64(&args[0]), int_arg(&args[1])?, round_on)))
    });

    library.add("int", |args| {
        arity("int", args, 1)?;
        Ok(Value::from(to_i64(&args[0])))
    });
    library.add("int64", |args| {
        arity("int64", args, 1)?;
        Ok(Value::from(to_i64(&args[0])))
    });
    library.add("float64", |args| {
        arity("float64", args, 1)?;
        Ok(number(to_f64(&args[0])))
    });
    library.add("atoi", |args| {
        arity("atoi", args, 1)?;
        let text = to_str(&args[0]);
        Ok(Value::from(text.trim().parse::<i64>().unwrap_or(0)))
    });
}


// rounds up once the fractional part of the shifted value reaches `round_on`
fn round(value: f64, places: i64, round_on: f64) -> f64 {
    let pow = 10f64.powi(places as i32);
    let shifted = pow * value;
    if shifted.fract() >= round_on {
        shifted.ceil() / pow
    } else {
        shifted.floor() / pow
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::config::Config;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, FuncError> {
        let library = Library::new(&Config::default()).unwrap();
        library.get(name).unwrap()(&args[..])
    }

    #[test]
    fn integer_math_is_lenient() {
        assert_eq!(call("add", vec![json!(1), json!("2"), json!(3.7)]).unwrap(), json!(6));
        assert_eq!(call("add1", vec![json!("nope")]).unwrap(), json!(1));
        assert_eq!(call("sub", vec![json!(10), json!(4)]).unwrap(), json!(6));
        assert_eq!(call("mul", vec![json!(2), json!(3), json!(4)]).unwrap(), json!(24));
        assert_eq!(call("div", vec![json!(7), json!(2)]).unwrap(), json!(3));
        assert_eq!(call("mod", vec![json!(7), json!(2)]).unwrap(), json!(1));
        assert_eq!(call("max", vec![json!(1), json!(9), json!(3)]).unwrap(), json!(9));
        assert_eq!(call("min", vec![json!(4), json!(-2)]).unwrap(), json!(-2));
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(
            call("div", vec![json!(1), json!(0)]).unwrap_err(),
            FuncError::message("integer divide by zero")
        );
        assert!(call("mod", vec![json!(1), json!(0)]).is_err());
        assert!(call("divf", vec![json!(1), json!(0)]).is_err());
    }

    #[test]
    fn float_math() {
        assert_eq!(call("addf", vec![json!(1.5), json!(2)]).unwrap(), json!(3.5));
        assert_eq!(call("subf", vec![json!(5), json!(1.5)]).unwrap(), json!(3.5));
        assert_eq!(call("mulf", vec![json!(1.5), json!(2)]).unwrap(), json!(3.0));
        assert_eq!(call("divf", vec![json!(3), json!(2)]).unwrap(), json!(1.5));
    }

    #[test]
    fn rounding() {
        assert_eq!(call("floor", vec![json!(1.7)]).unwrap(), json!(1.0));
        assert_eq!(call("ceil", vec![json!("1.2")]).unwrap(), json!(2.0));
        assert_eq!(round(1.25, 1, 0.5), 1.3);
        assert_eq!(round(1.24, 1, 0.5), 1.2);
        assert_eq!(round(123.555, 2, 0.6), 123.55);
        assert_eq!(round(2.5, 0, 0.5), 3.0);
    }

    #[test]
    fn conversions() {
        assert_eq!(call("int", vec![json!("42")]).unwrap(), json!(42));
        assert_eq!(call("int64", vec![json!(2.9)]).unwrap(), json!(2));
        assert_eq!(call("float64", vec![json!("1.25")]).unwrap(), json!(1.25));
        assert_eq!(call("atoi", vec![json!("12")]).unwrap(), json!(12));
        assert_eq!(call("atoi", vec![json!("0x1f")]).unwrap(), json!(0));
    }
}
