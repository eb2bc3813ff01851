//! Common test utilities and macros

use teal_ir::value::Value;
use teal_ir::{Console, InterpConfig, Interpreter, demos};

#[derive(Debug)]
pub enum TestResult {
    /// Returned value, with whatever was printed ignored.
    Value(Value),
    /// Returned value and the exact printed output.
    Output { value: Value, printed: String },
    Error(String),
    ErrorRegex(String),
}

impl PartialEq for TestResult {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TestResult::Value(a), TestResult::Value(b)) => a == b,
            (TestResult::Value(a), TestResult::Output { value, .. })
            | (TestResult::Output { value, .. }, TestResult::Value(a)) => a == value,
            (
                TestResult::Output { value: a, printed: pa },
                TestResult::Output { value: b, printed: pb },
            ) => a == b && pa == pb,
            (TestResult::Error(a), TestResult::Error(b)) => a == b,
            (TestResult::ErrorRegex(pattern), TestResult::Error(msg)) => {
                regex::Regex::new(pattern).unwrap().is_match(msg)
            }
            (TestResult::Error(msg), TestResult::ErrorRegex(pattern)) => {
                regex::Regex::new(pattern).unwrap().is_match(msg)
            }
            _ => false,
        }
    }
}

/// Lower and evaluate demo `name`, feeding `input` to `read`.
pub fn run_demo_test(name: &str, args: Vec<Value>, input: &str) -> TestResult {
    run_demo_with_config(name, args, input, InterpConfig::default())
}

pub fn run_demo_with_config(
    name: &str,
    args: Vec<Value>,
    input: &str,
    config: InterpConfig,
) -> TestResult {
    let demo = demos::find(name).unwrap_or_else(|| panic!("no demo named {name}"));
    let program = match demo.lower() {
        Ok(program) => program,
        Err(e) => return TestResult::Error(format!("{e:#}")),
    };
    let (console, output) = Console::buffered(input);
    let result = Interpreter::new(&program)
        .with_console(console)
        .with_config(config)
        .eval(args);
    match result {
        Ok(result) => TestResult::Output {
            value: result.into_return_value(),
            printed: output.contents(),
        },
        Err(e) => TestResult::Error(e.to_string()),
    }
}

#[macro_export]
macro_rules! check_demo {
    ($test_name:ident, demo=$demo:expr, args=[$($arg:expr),* $(,)?], result=$expected:expr) => {
        check_demo!($test_name, demo=$demo, args=[$($arg),*], input="", result=$expected);
    };
    ($test_name:ident, demo=$demo:expr, args=[$($arg:expr),* $(,)?], input=$input:expr, result=$expected:expr) => {
        #[test]
        fn $test_name() {
            let args = vec![$(teal_ir::value::Value::from($arg)),*];
            let result = crate::common::run_demo_test($demo, args, $input);
            assert_eq!(result, $expected);
        }
    };
}
