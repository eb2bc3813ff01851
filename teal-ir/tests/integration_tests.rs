#[macro_use]
mod common;

use common::TestResult;
use teal_ir::value::Value;
use teal_ir::{InterpConfig, demos};

fn output(value: impl Into<Value>, printed: &str) -> TestResult {
    TestResult::Output {
        value: value.into(),
        printed: printed.to_string(),
    }
}

check_demo!(
    test_recursive_sum,
    demo = "sum_rec",
    args = [20_i64],
    result = TestResult::Value(Value::Int(210))
);

check_demo!(
    test_recursive_sum_base_case,
    demo = "sum_rec",
    args = [0_i64],
    result = TestResult::Value(Value::Int(0))
);

check_demo!(
    test_loop_sum,
    demo = "sum_loop",
    args = [100_i64],
    result = TestResult::Value(Value::Int(5050))
);

check_demo!(
    test_fact_zero,
    demo = "fact",
    args = [0_i64],
    result = TestResult::Value(Value::Int(1))
);

check_demo!(
    test_fact,
    demo = "fact",
    args = [6_i64],
    result = TestResult::Value(Value::Int(720))
);

check_demo!(
    test_array_fill_and_sum,
    demo = "array",
    args = [11_i64],
    result = output(55_i64, "11\n")
);

check_demo!(
    test_empty_array,
    demo = "array",
    args = [0_i64],
    result = output(0_i64, "0\n")
);

check_demo!(
    test_negative_array_size,
    demo = "array",
    args = [-1_i64],
    result = TestResult::ErrorRegex(r"negative size -1".to_string())
);

check_demo!(
    test_diamond_initializes_base_once,
    demo = "diamond",
    args = [27_i64],
    result = output(54_i64, "base initialized\nleft\nright\n")
);

check_demo!(
    test_global_initializers_in_order,
    demo = "global_init",
    args = [],
    result = TestResult::Value(Value::Int(6))
);

check_demo!(
    test_unassigned_global_is_null,
    demo = "unassigned_global",
    args = [],
    result = TestResult::Value(Value::Null)
);

check_demo!(
    test_string_concat,
    demo = "string_concat",
    args = [],
    result = output("Hello World", "Hello World\n")
);

check_demo!(
    test_invalid_plus,
    demo = "invalid_plus",
    args = [],
    result = TestResult::Error(
        "while calling builtin operation __builtin_int_add, parameter #1 expects int but received string"
            .to_string()
    )
);

check_demo!(
    test_eq_different,
    demo = "eq",
    args = [10_i64, 13_i64],
    result = TestResult::Value(Value::Int(0))
);

check_demo!(
    test_eq_same,
    demo = "eq",
    args = [1001_i64, 1001_i64],
    result = TestResult::Value(Value::Int(1))
);

check_demo!(
    test_eq_mixed_kinds,
    demo = "eq",
    args = [1_i64, "1"],
    result = TestResult::Value(Value::Int(0))
);

check_demo!(
    test_read_number,
    demo = "read_echo",
    args = [],
    input = "21\n",
    result = output(42_i64, "")
);

check_demo!(
    test_read_text,
    demo = "read_echo",
    args = [],
    input = "hello\r\n",
    result = output("hello", "hello\n")
);

check_demo!(
    test_read_at_end_of_input,
    demo = "read_echo",
    args = [],
    input = "",
    result = TestResult::ErrorRegex(r"I/O error while executing read: end of input".to_string())
);

check_demo!(
    test_entry_arity_mismatch,
    demo = "sum_rec",
    args = [],
    result = TestResult::ErrorRegex(r"wrong number of arguments to main::main: expected 1, got 0".to_string())
);

check_demo!(
    test_callee_writes_are_visible_through_every_alias,
    demo = "alias",
    args = [],
    result = TestResult::Value(Value::Int(9))
);

check_demo!(
    test_index_in_range,
    demo = "index",
    args = [2_i64],
    result = output(7_i64, "[null, null, 7]\n")
);

check_demo!(
    test_index_past_end,
    demo = "index",
    args = [3_i64],
    result = TestResult::ErrorRegex(
        r"index out of bounds: index 3 but the array has 3 elements".to_string()
    )
);

check_demo!(
    test_negative_index,
    demo = "index",
    args = [-1_i64],
    result = TestResult::ErrorRegex(r"index out of bounds: index -1".to_string())
);

#[test]
fn test_alias_global_shares_the_array() {
    let program = demos::find("alias").unwrap().lower().unwrap();
    let (console, _output) = teal_ir::Console::buffered("");
    let result = teal_ir::Interpreter::new(&program)
        .with_console(console)
        .eval(vec![])
        .unwrap();
    let shared = result.global_by_name(&program, "main", "shared").unwrap();
    assert_eq!(shared.to_string(), "[4, 5]");
}

#[test]
fn test_stack_overflow_is_reported() {
    let config = InterpConfig { max_call_depth: 64 };
    let result = common::run_demo_with_config("sum_rec", vec![Value::Int(1_000)], "", config);
    assert_eq!(
        result,
        TestResult::ErrorRegex(r"call depth exceeded the limit of 64 frames".to_string())
    );

    let config = InterpConfig { max_call_depth: 64 };
    let result = common::run_demo_with_config("sum_rec", vec![Value::Int(30)], "", config);
    assert_eq!(result, TestResult::Value(Value::Int(465)));
}

#[test]
fn test_recursion_up_to_default_depth() {
    let limit = InterpConfig::default().max_call_depth as i64;
    // `main` plus `sum(n)` down to `sum(0)` fills exactly `limit` frames.
    let n = limit - 2;
    let result = common::run_demo_test("sum_rec", vec![Value::Int(n)], "");
    assert_eq!(result, TestResult::Value(Value::Int(n * (n + 1) / 2)));

    let result = common::run_demo_test("sum_rec", vec![Value::Int(n + 1)], "");
    assert_eq!(
        result,
        TestResult::ErrorRegex(format!("call depth exceeded the limit of {limit} frames"))
    );
}

#[test]
fn test_diamond_globals() {
    let program = demos::find("diamond").unwrap().lower().unwrap();
    let (console, _output) = teal_ir::Console::buffered("");
    let result = teal_ir::Interpreter::new(&program)
        .with_console(console)
        .eval(vec![Value::Int(1)])
        .unwrap();
    assert_eq!(
        result.global_by_name(&program, "base", "calls"),
        Some(&Value::Int(2))
    );
    // `print` returns null, so that is what the banner holds.
    assert_eq!(
        result.global_by_name(&program, "base", "banner"),
        Some(&Value::Null)
    );
    assert_eq!(result.global_by_name(&program, "base", "missing"), None);
}

#[test]
fn test_run_lowers_and_evaluates() {
    let program = demos::find("sum_loop").unwrap().program();
    let result = teal_ir::run(&program, vec![Value::Int(4)]).unwrap();
    assert_eq!(result.return_value(), &Value::Int(10));
}

#[test]
fn test_parse_arg() {
    assert_eq!(teal_ir::parse_arg("-12"), Value::Int(-12));
    assert_eq!(teal_ir::parse_arg("twelve"), Value::from("twelve"));
    assert_eq!(teal_ir::parse_arg(""), Value::from(""));
}
