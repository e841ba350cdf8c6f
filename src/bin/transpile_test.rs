use mathpad::expr::{Value, evaluate};
use mathpad::scope::Scope;
use mathpad::transpile::{TranspileError, transpile};

fn assert_transpiles(markup: &str, expected: &str) {
    let linear = transpile(markup).unwrap();
    assert_eq!(linear, expected, "markup: {}", markup);
    println!("✓ {} -> {}", markup, linear);
}

fn assert_close(actual: f64, expected: f64, context: &str) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "{}: {} vs {}",
        context,
        actual,
        expected
    );
    println!("✓ {} = {}", context, actual);
}

fn eval_real(markup: &str, scope: &Scope) -> f64 {
    let linear = transpile(markup).unwrap();
    match evaluate(&linear, scope).unwrap() {
        Value::Real(x) => x,
        Value::Complex(c) => panic!("expected a real result, got {}", c),
    }
}

fn test_construct_rewriting() {
    println!("\n====== Construct rewriting ======");
    assert_transpiles("\\frac{4}{\\pi}\\sin\\left(x\\cdot\\pi\\right)", "((4)/(pi))sin(x*pi)");
    assert_transpiles("x^{2}+1", "x^(2)+1");
    assert_transpiles("\\sqrt{x+1}", "sqrt(x+1)");
    assert_transpiles("\\log_{2}\\left(x\\right)", "log(x,2)");
    assert_transpiles("\\ln\\left(x\\right)", "log(x)");
    assert_transpiles("\\log\\left(x\\right)", "log(x)");
    assert_transpiles("\\frac{\\frac{1}{2}}{3}", "((((1)/(2)))/(3))");
    assert_transpiles("x^{\\sqrt{2}}", "x^(sqrt(2))");
    assert_transpiles("a \\cdot b", "a*b");
    assert_transpiles("\\left[x+1\\right]\\cdot 2", "[x+1]*2");
    assert_transpiles("\\cos\\left(\\pi\\right)", "cos(pi)");
}

fn test_evaluation_of_transpiled() {
    println!("\n====== Evaluation of transpiled markup ======");
    let mut scope = Scope::new();
    scope.insert("x".to_string(), 0.5);

    // (4/pi) * sin(0.5 * pi) == 4/pi
    let value = eval_real("\\frac{4}{\\pi}\\sin\\left(x\\cdot\\pi\\right)", &scope);
    assert_close(value, 4.0 / std::f64::consts::PI, "(4/pi)sin(x pi) at x=0.5");
    assert!((value - 1.2732).abs() < 1e-4);

    let value = eval_real("x^{2}+1", &scope);
    assert_close(value, 1.25, "x^2+1 at x=0.5");

    let value = eval_real("\\sqrt{x+0.5}", &scope);
    assert_close(value, 1.0, "sqrt(x+0.5) at x=0.5");

    let value = eval_real("\\log_{2}\\left(8\\right)", &scope);
    assert_close(value, 3.0, "log_2(8)");

    let value = eval_real("\\ln\\left(e\\right)", &scope);
    assert_close(value, 1.0, "ln(e)");

    let value = eval_real("\\cos\\left(\\pi\\right)", &scope);
    assert_close(value, -1.0, "cos(pi)");

    // Implicit multiplication straight from the rewriting.
    let value = eval_real("2x\\cdot\\frac{1}{x}", &scope);
    assert_close(value, 2.0, "2x * 1/x");
}

fn test_complex_promotion() {
    println!("\n====== Complex promotion ======");
    let scope = Scope::new();

    let linear = transpile("\\sqrt{-4}").unwrap();
    match evaluate(&linear, &scope).unwrap() {
        Value::Complex(c) => {
            assert_eq!(c.re, 0.0);
            assert!((c.im - 2.0).abs() < 1e-12);
            println!("✓ sqrt(-4) = {}", c);
        }
        Value::Real(x) => panic!("sqrt(-4) evaluated to the real {}", x),
    }

    // A real computation must classify as real, exactly.
    match evaluate("sqrt(4)+sin(1)", &scope).unwrap() {
        Value::Real(_) => println!("✓ real computations stay real"),
        Value::Complex(c) => panic!("real computation drifted complex: {}", c),
    }
}

fn test_malformed_markup() {
    println!("\n====== Malformed markup ======");
    assert!(matches!(
        transpile("\\frac{1}{"),
        Err(TranspileError::Unbalanced("\\frac"))
    ));
    println!("✓ unbalanced \\frac rejected");

    assert!(matches!(
        transpile("\\frac{1}"),
        Err(TranspileError::MissingArgument("\\frac"))
    ));
    println!("✓ \\frac with one argument rejected");

    assert!(matches!(transpile("x^{2"), Err(TranspileError::Unbalanced("^"))));
    println!("✓ unbalanced exponent rejected");

    assert!(matches!(
        transpile("\\sqrt{x"),
        Err(TranspileError::Unbalanced("\\sqrt"))
    ));
    println!("✓ unbalanced \\sqrt rejected");

    assert!(matches!(
        transpile("\\weird{2}"),
        Err(TranspileError::Unsupported(_))
    ));
    println!("✓ unknown command rejected");

    assert!(matches!(
        transpile("x+{y}"),
        Err(TranspileError::Unsupported(_))
    ));
    println!("✓ stray braces rejected");
}

fn test_evaluator_failures() {
    println!("\n====== Evaluator failures ======");
    let scope = Scope::new();

    assert!(evaluate("nope+1", &scope).is_err());
    println!("✓ unknown symbol is an error, not a crash");

    assert!(evaluate("mystery(3)", &scope).is_err());
    println!("✓ unknown function is an error");

    assert!(evaluate("1/0", &scope).is_err());
    println!("✓ division by zero is an error");

    assert!(evaluate("2+*3", &scope).is_err());
    assert!(evaluate("", &scope).is_err());
    println!("✓ syntax errors are errors");
}

fn main() {
    test_construct_rewriting();
    test_evaluation_of_transpiled();
    test_complex_promotion();
    test_malformed_markup();
    test_evaluator_failures();
    println!("\nAll transpiler tests passed.");
}
