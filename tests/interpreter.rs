#[cfg(test)]
mod interpreter_tests {
    use kunyu::error::{ErrorKind, KunyuError};
    use kunyu::interpreter::{
        run_source, Interpreter, InterpreterConfig, Session, DEFAULT_MAX_CALL_DEPTH,
    };
    use kunyu::value::live_objects;

    fn run(source: &str) -> (String, Result<(), KunyuError>) {
        Session::new().evaluate(source)
    }

    fn assert_output(source: &str, expected: &str) {
        let (output, result) = run(source);

        if let Err(e) = result {
            panic!("unexpected error for {:?}: {}", source, e);
        }

        assert_eq!(output, expected, "source: {}", source);
    }

    fn assert_runtime_error(source: &str, message: &str) {
        let (_, result) = run(source);
        let err = result.expect_err("expected a runtime error");

        assert_eq!(err.kind(), ErrorKind::Runtime, "got: {}", err);
        assert!(
            err.message().contains(message),
            "expected '{}' in '{}'",
            message,
            err
        );
    }

    // ── behaviour required of every implementation ──────────────────────

    #[test]
    fn test_operators_have_no_precedence() {
        assert_output("变量 x = 1 + 2 * 3; 输出 x;", "9\n");
        assert_output("输出 10 - 2 - 3;", "5\n");
        assert_output("输出 1 + (2 * 3);", "7\n");
    }

    #[test]
    fn test_inner_declaration_shadows() {
        assert_output("变量 x = 1; 如果 (1) { 变量 x = 2; } 输出 x;", "1\n");
    }

    #[test]
    fn test_constant_protection() {
        let mut session = Session::new();

        let (_, result) = session.evaluate("常量 x = 1; x = 2;");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.message().contains("不能修改常量: x"));

        let (output, result) = session.evaluate("输出 x;");
        assert!(result.is_ok());
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        assert_runtime_error("输出 1 / 0;", "除数不能为零");
        assert_runtime_error("输出 1 % 0;", "模运算的除数不能为零");
        // The divisor is truncated before the check.
        assert_runtime_error("输出 1 % 0.5;", "模运算的除数不能为零");
    }

    #[test]
    fn test_string_coercion_in_addition() {
        assert_output("输出 1 + \"a\";", "1a\n");
        assert_output("输出 \"值:\" + 2.5;", "值:2.5\n");
        assert_output("输出 \"列表\" + 创建列表();", "列表[列表，长度: 0]\n");
    }

    #[test]
    fn test_live_objects_return_to_baseline() {
        let baseline = live_objects();

        {
            let mut session = Session::new();
            let (output, result) = session.evaluate(
                "变量 l = 创建列表();
                 列表添加(l, 1);
                 列表添加(l, \"二\");
                 变量 d = 创建字典();
                 字典设置(d, \"列表\", l);
                 字典设置(d, \"数\", 3);
                 函数 长(x) { 返回 列表长度(x); }
                 输出 长(l);
                 输出 字典大小(d);",
            );

            assert!(result.is_ok());
            assert_eq!(output, "2\n2\n");
            assert!(live_objects() > baseline);
        }

        assert_eq!(live_objects(), baseline);
    }

    #[test]
    fn test_arity_is_enforced() {
        assert_runtime_error(
            "函数 加(a,b){返回 a+b;} 加(1);",
            "函数'加'需要2个参数，但接收到1个",
        );
    }

    #[test]
    fn test_return_inside_loop_stops_the_loop() {
        assert_output("函数 f(){ 循环 (1) { 返回 5; } } 输出 f();", "5\n");
    }

    #[test]
    fn test_counting_loop() {
        assert_output(
            "变量 x = 0; 循环 (x < 3) { 输出 x; x = x + 1; }",
            "0\n1\n2\n",
        );
    }

    #[test]
    fn test_fresh_sessions_are_deterministic() {
        let source = "变量 i = 0; 循环 (i < 4) { 输出 i * i; i = i + 1; } 输出 i / 0;";

        let (first_output, first_result) = run(source);
        let (second_output, second_result) = run(source);

        assert_eq!(first_output, second_output);
        assert_eq!(
            first_result.unwrap_err().kind(),
            second_result.unwrap_err().kind()
        );
    }

    // ── scoping and calls ───────────────────────────────────────────────

    #[test]
    fn test_callee_sees_caller_locals() {
        assert_output(
            "函数 f() { 输出 y; } 函数 g() { 变量 y = 7; f(); } g();",
            "7\n",
        );
        assert_output(
            "函数 加一() { c = c + 1; } 变量 c = 0; 加一(); 加一(); 输出 c;",
            "2\n",
        );
    }

    #[test]
    fn test_arguments_are_evaluated_in_caller_scope() {
        assert_output(
            "变量 n = 10; 函数 f(n) { 返回 n * 2; } 输出 f(n + 1);",
            "22\n",
        );
    }

    #[test]
    fn test_recursion() {
        assert_output(
            "函数 fib(n) { 如果 (n < 2) { 返回 n; } 返回 fib(n - 1) + fib(n - 2); }
             输出 fib(10);",
            "55\n",
        );
    }

    #[test]
    fn test_call_depth_ceiling() {
        let mut session = Session::with_config(InterpreterConfig { max_call_depth: 20 });

        let (_, result) = session.evaluate("函数 f(n) { 返回 f(n + 1); } f(0);");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.message().contains("超出最大调用深度"));

        // The failed call left the session usable.
        let (output, result) = session.evaluate("变量 z = 3; 输出 z;");
        assert!(result.is_ok());
        assert_eq!(output, "3\n");
    }

    fn nested_recursion(blocks: usize, n: usize) -> String {
        format!(
            "函数 f(n) {{ 如果 (n > 0) {{ {} 返回 f(n - 1) + 1; {} }} 返回 0; }} 输出 f({});",
            "如果 (1) { ".repeat(blocks),
            "} ".repeat(blocks),
            n
        )
    }

    #[test]
    fn test_deep_blocks_at_the_call_ceiling() {
        let depth = DEFAULT_MAX_CALL_DEPTH - 1;

        assert_output(&nested_recursion(200, depth), &format!("{}\n", depth));
    }

    #[test]
    fn test_deep_blocks_past_the_call_ceiling() {
        assert_runtime_error(&nested_recursion(200, 250), "超出最大调用深度");
    }

    #[test]
    fn test_dropping_a_session_frees_long_chains() {
        let baseline = live_objects();

        {
            let mut session = Session::new();
            let (output, result) = session.evaluate(
                "变量 链 = 创建列表();
                 变量 i = 0;
                 循环 (i < 200000) {
                     变量 节点 = 创建列表();
                     列表添加(节点, 链);
                     链 = 节点;
                     i = i + 1;
                 }
                 输出 i;",
            );

            assert!(result.is_ok(), "{:?}", result);
            assert_eq!(output, "200000\n");
            assert!(live_objects() > baseline + 200_000);
        }

        assert_eq!(live_objects(), baseline);
    }

    #[test]
    fn test_functions_persist_and_cannot_be_redefined() {
        let mut session = Session::new();

        let (_, result) = session.evaluate("函数 双(x) { 返回 x * 2; }");
        assert!(result.is_ok());
        assert!(session.interpreter().is_function_defined("双"));

        let (output, _) = session.evaluate("输出 双(4);");
        assert_eq!(output, "8\n");

        let (_, result) = session.evaluate("函数 双(x) { 返回 x; }");
        assert!(result
            .unwrap_err()
            .message()
            .contains("函数'双'已经定义"));
    }

    #[test]
    fn test_globals_persist_across_evaluations() {
        let mut session = Session::new();

        session.evaluate("变量 总 = 1;").1.unwrap();
        session.evaluate("总 = 总 + 41;").1.unwrap();

        let (output, _) = session.evaluate("输出 总;");
        assert_eq!(output, "42\n");
        assert_eq!(
            session.interpreter().global("总").and_then(|v| v.as_number()),
            Some(42.0)
        );

        let (_, result) = session.evaluate("变量 总 = 2;");
        assert!(result.unwrap_err().message().contains("变量'总'已经在当前作用域中定义"));
    }

    #[test]
    fn test_builtins_shadow_user_functions() {
        assert_output(
            "函数 创建列表() { 返回 1; } 输出 创建列表();",
            "[列表，长度: 0]\n",
        );
    }

    #[test]
    fn test_void_results() {
        // Discarding is fine.
        assert_output("函数 f() { } f(); 输出 1;", "1\n");
        assert_output("变量 d = 创建字典(); 字典获取(d, \"缺\"); 输出 2;", "2\n");

        assert_runtime_error("函数 f() { } 变量 x = f();", "没有产生值");
        assert_runtime_error("函数 f() { 返回; } 输出 f();", "没有产生值");
        assert_runtime_error("变量 d = 创建字典(); 输出 字典获取(d, \"缺\");", "没有产生值");
    }

    // ── statements ──────────────────────────────────────────────────────

    #[test]
    fn test_if_else_chain() {
        let source = "函数 级(n) {
                          如果 (n > 90) { 返回 \"优\"; } 否则 如果 (n > 60) { 返回 \"良\"; } 否则 { 返回 \"差\"; }
                      }
                      输出 级(95); 输出 级(70); 输出 级(10);";

        assert_output(source, "优\n良\n差\n");
    }

    #[test]
    fn test_top_level_return_stops_program() {
        assert_output("输出 1; 返回; 输出 2;", "1\n");
    }

    #[test]
    fn test_partial_effects_survive_failure() {
        let mut session = Session::new();

        let (output, result) = session.evaluate("变量 a = 1; 输出 5; 输出 1 / 0; 输出 6;");
        assert_eq!(output, "5\n");
        assert!(result.is_err());

        let (output, result) = session.evaluate("输出 a;");
        assert!(result.is_ok());
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_block_releases_locals() {
        let mut session = Session::new();
        let baseline = live_objects();

        let (_, result) =
            session.evaluate("如果 (1) { 变量 l = 创建列表(); 列表添加(l, \"x\"); }");
        assert!(result.is_ok());

        assert_eq!(live_objects(), baseline);
    }

    // ── operators ───────────────────────────────────────────────────────

    #[test]
    fn test_arithmetic_and_number_printing() {
        assert_output("输出 0.1 + 0.2;", "0.3\n");
        assert_output("输出 10 / 4;", "2.5\n");
        assert_output("输出 1 / 3;", "0.333333\n");
        assert_output("输出 7.9 % 3.2;", "1\n");
        assert_output("输出 -7 % 3;", "-1\n");
        assert_output("输出 -(2 + 3);", "-5\n");
    }

    #[test]
    fn test_comparisons_and_logic_yield_numbers() {
        assert_output("输出 (3 > 2) + (2 > 3);", "1\n");
        assert_output("输出 2 == 2;", "1\n");
        assert_output("输出 2 != 2;", "0\n");
        assert_output("输出 1 && 0;", "0\n");
        assert_output("输出 0 || 2;", "1\n");
        assert_output("输出 !0;", "1\n");
        assert_output("输出 !3;", "0\n");
    }

    #[test]
    fn test_type_errors() {
        assert_runtime_error("输出 创建列表() - 1;", "类型不匹配的运算");
        assert_runtime_error("输出 \"a\" * 2;", "类型不匹配的运算");
        assert_runtime_error("输出 \"a\" == \"a\";", "类型不匹配的运算");
        assert_runtime_error("输出 !\"x\";", "操作数必须是数字");
        assert_runtime_error("输出 -创建字典();", "操作数必须是数字");
    }

    #[test]
    fn test_truthiness_of_conditions() {
        assert_output("如果 (\"\") { 输出 1; } 否则 { 输出 0; }", "0\n");
        assert_output("如果 (\"a\") { 输出 1; } 否则 { 输出 0; }", "1\n");
        assert_output("如果 (创建列表()) { 输出 1; }", "1\n");
    }

    // ── errors ──────────────────────────────────────────────────────────

    #[test]
    fn test_undefined_names() {
        let (_, result) = run("输出 q;");
        let err = result.unwrap_err();

        assert_eq!(err.position(), Some((1, 4)));
        assert!(err.message().contains("未定义的变量: q"));

        assert_runtime_error("q = 1;", "未定义的变量: q");
        assert_runtime_error("不存在(1);", "未定义的函数: 不存在");
    }

    #[test]
    fn test_error_display() {
        let (_, result) = run("输出 1 / 0;");

        assert_eq!(
            result.unwrap_err().to_string(),
            "[line 1, column 6] Runtime error: 除数不能为零"
        );

        let (_, result) = run("输出 1 $ 2;");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Lex);

        let (_, result) = run("输出 (1;");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_interpreter_writes_to_any_sink() {
        let mut interpreter = Interpreter::new(Vec::new());

        run_source(&mut interpreter, "输出 \"你好\"; 输出 3;").unwrap();

        let output = String::from_utf8(interpreter.into_output()).unwrap();
        assert_eq!(output, "你好\n3\n");
    }

    #[test]
    fn test_reset_forgets_state() {
        let mut session = Session::new();

        session.evaluate("变量 x = 1; 函数 f() { }").1.unwrap();
        session.interpreter_mut().reset();

        assert!(session.interpreter().global("x").is_none());
        assert!(!session.interpreter().is_function_defined("f"));
    }
}
