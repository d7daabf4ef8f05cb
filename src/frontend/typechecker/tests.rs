//! Type checker tests: whole-pipeline scenarios over small programs.

use crate::frontend::ast::{Spanned, Stmt};
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::source::Span;

use super::TypeChecker;

fn check_source(source: &str) -> TypeChecker {
    let lexer = Lexer::new(source, "<test>");
    let mut parser = Parser::new(lexer);
    let program = parser.parse();
    assert!(
        parser.lex_errors().is_empty(),
        "unexpected lex errors: {:?}",
        parser.lex_errors()
    );
    assert!(parser.errors().is_empty(), "unexpected parse errors: {:?}", parser.errors());
    let mut checker = TypeChecker::new();
    checker.check(&program);
    checker
}

fn messages(checker: &TypeChecker) -> Vec<String> {
    checker.errors().iter().map(|e| e.message.clone()).collect()
}

#[test]
fn function_signature_is_registered() {
    let checker = check_source("fn add(a: i32, b: i32) -> i32:\n    return a + b\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
    let symbol = checker.symbols().lookup("add").expect("add should be defined");
    assert_eq!(symbol.ty.to_string(), "fn(i32, i32) -> i32");
}

#[test]
fn assignment_to_immutable_binding_is_rejected() {
    let checker = check_source("fn test():\n    let x = 10\n    x = 20\n");
    let msgs = messages(&checker);
    assert_eq!(msgs.len(), 1, "expected one error, got {:?}", msgs);
    assert_eq!(msgs[0], "Cannot assign to immutable variable 'x'");
}

#[test]
fn mutable_binding_can_be_reassigned() {
    let checker = check_source("fn test():\n    var x = 10\n    x = 20\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn undefined_symbol_is_reported() {
    let checker = check_source("fn test():\n    let y = undefined_var\n");
    let msgs = messages(&checker);
    assert_eq!(msgs.len(), 1, "expected one error, got {:?}", msgs);
    assert_eq!(msgs[0], "Undefined symbol 'undefined_var'");
}

#[test]
fn break_outside_loop_is_rejected() {
    let checker = check_source("fn test():\n    break\n");
    let msgs = messages(&checker);
    assert_eq!(msgs.len(), 1, "expected one error, got {:?}", msgs);
    assert_eq!(msgs[0], "'break' outside of loop");
}

#[test]
fn break_inside_nested_loop_is_accepted() {
    let checker = check_source(
        "fn test():\n    while true:\n        if true:\n            break\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn continue_outside_loop_is_rejected() {
    let checker = check_source("fn test():\n    continue\n");
    assert_eq!(messages(&checker), vec!["'continue' outside of loop".to_string()]);
}

#[test]
fn bad_initializer_does_not_stop_later_checks() {
    let checker =
        check_source("fn test() -> i32:\n    let x: i32 = \"hi\"\n    return x\n");
    let msgs = messages(&checker);
    // One mismatch on the initializer; the return is still checked and
    // accepted against i32 because the annotation is adopted.
    assert_eq!(msgs.len(), 1, "expected one error, got {:?}", msgs);
    assert_eq!(msgs[0], "Type mismatch: expected i32, got str");
}

#[test]
fn enum_variants_become_constructors() {
    let checker = check_source("enum Color:\n    Red\n    RGB(i32, i32, i32)\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
    assert!(checker.symbols().lookup_type("Color").is_some());

    let red = checker.symbols().lookup("Color::Red").expect("Color::Red constructor");
    assert_eq!(red.ty.to_string(), "fn() -> Color");
    let rgb = checker.symbols().lookup("Color::RGB").expect("Color::RGB constructor");
    assert_eq!(rgb.ty.to_string(), "fn(i32, i32, i32) -> Color");
}

#[test]
fn missing_return_in_non_void_function() {
    let checker = check_source("fn f() -> i32:\n    let x = 1\n");
    let msgs = messages(&checker);
    assert_eq!(msgs.len(), 1, "expected one error, got {:?}", msgs);
    assert_eq!(msgs[0], "Function 'f' must return a value");
}

#[test]
fn void_function_needs_no_return() {
    let checker = check_source("fn f():\n    print(1)\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn return_in_branch_counts() {
    let checker = check_source(
        "fn f(x: bool) -> i32:\n    if x:\n        return 1\n    return 0\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn return_outside_function_is_rejected() {
    // Top-level statements never reach the checker through the parser, so
    // drive the statement checker directly.
    let mut checker = TypeChecker::new();
    checker.check_statement(&Spanned::new(Stmt::Return(None), Span::default()));
    assert_eq!(messages(&checker), vec!["'return' outside of function".to_string()]);
}

#[test]
fn return_type_mismatch() {
    let checker = check_source("fn f() -> i32:\n    return \"nope\"\n");
    assert_eq!(
        messages(&checker),
        vec!["Type mismatch: expected i32, got str".to_string()]
    );
}

#[test]
fn condition_must_be_bool() {
    let checker = check_source("fn f():\n    if 1:\n        print(1)\n");
    assert_eq!(messages(&checker), vec!["Condition must be bool".to_string()]);
}

#[test]
fn argument_count_and_types_are_checked() {
    let checker = check_source(
        "fn add(a: i32, b: i32) -> i32:\n    return a + b\nfn g() -> i32:\n    return add(1)\n",
    );
    assert_eq!(messages(&checker), vec!["Expected 2 arguments, got 1".to_string()]);

    let checker = check_source(
        "fn add(a: i32, b: i32) -> i32:\n    return a + b\nfn g() -> i32:\n    return add(1, \"x\")\n",
    );
    assert_eq!(
        messages(&checker),
        vec!["Type mismatch: expected i32, got str".to_string()]
    );
}

#[test]
fn calling_a_non_function_is_rejected() {
    let checker = check_source("fn f():\n    let x = 1\n    x()\n");
    assert_eq!(messages(&checker), vec!["Cannot call non-function type".to_string()]);
}

#[test]
fn indexing_and_members() {
    let checker = check_source(
        "fn f(items: List[str]) -> str:\n    return items[0]\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));

    let checker = check_source("fn f() -> i32:\n    return true[0]\n");
    assert_eq!(messages(&checker), vec!["Cannot index type bool".to_string()]);
}

#[test]
fn struct_fields_resolve_through_members() {
    let checker = check_source(
        "struct Point:\n    x: f64\n    y: f64\nfn f(p: Point) -> f64:\n    return p.x\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));

    let checker = check_source(
        "struct Point:\n    x: f64\nfn f(p: Point) -> f64:\n    return p.z\n",
    );
    assert_eq!(
        messages(&checker),
        vec!["Struct 'Point' has no field 'z'".to_string()]
    );
}

#[test]
fn methods_see_self() {
    let checker = check_source(
        "struct Point:\n    x: f64\n    fn get_x() -> f64:\n        return self.x\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn structs_may_forward_reference_peers() {
    let checker = check_source(
        "struct Node:\n    next: Edge\nstruct Edge:\n    weight: f64\nfn f(n: Node) -> f64:\n    return n.next.weight\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn for_loop_binds_the_element_type() {
    let checker = check_source(
        "fn f(items: List[str]):\n    for item in items:\n        let x: i32 = item\n",
    );
    assert_eq!(
        messages(&checker),
        vec!["Type mismatch: expected i32, got str".to_string()]
    );

    // Ranges iterate as i64.
    let checker = check_source("fn f():\n    for i in 0..10:\n        print(i + 1)\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn use_of_uninitialized_variable() {
    let checker = check_source("fn f() -> i64:\n    let x: i64\n    return x\n");
    assert_eq!(
        messages(&checker),
        vec!["Use of uninitialized variable 'x'".to_string()]
    );

    // Assignment initializes before the read.
    let checker = check_source("fn f() -> i64:\n    var x: i64\n    x = 3\n    return x\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn binding_without_type_or_initializer_is_rejected() {
    let checker = check_source("fn f():\n    let x\n");
    assert_eq!(
        messages(&checker),
        vec!["Cannot determine type of 'x'".to_string()]
    );
}

#[test]
fn redefinition_in_same_scope() {
    let checker = check_source("fn f():\n    let x = 1\n    let x = 2\n");
    assert_eq!(messages(&checker), vec!["Redefinition of 'x'".to_string()]);
}

#[test]
fn generic_function_checks_cleanly() {
    let checker = check_source("fn first[T](items: List[T]) -> T:\n    return items[0]\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
    let symbol = checker.symbols().lookup("first").expect("first");
    assert_eq!(symbol.type_params, vec!["T".to_string()]);
}

#[test]
fn trait_impl_relationship_is_recorded() {
    let checker = check_source(
        "trait Greet:\n    fn greet(name: str) -> str\nstruct Dog:\n    name: str\nimpl Greet for Dog:\n    fn greet(name: str) -> str:\n        return name\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
    assert_eq!(
        checker.trait_impls(),
        &[("Greet".to_string(), "Dog".to_string())]
    );
}

#[test]
fn type_alias_registers_the_aliased_type() {
    let checker = check_source("type Id = i64\nfn f(x: Id) -> i64:\n    return x\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
    let alias = checker.symbols().lookup_type("Id").expect("alias registered");
    assert_eq!(alias.to_string(), "i64");
}

#[test]
fn builtin_generic_applications() {
    let checker = check_source(
        "fn f(d: Dict[str, i64], o: Optional[i64], r: Result[i64, str]) -> i64:\n    return d[\"k\"]\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn match_guard_must_be_bool() {
    let checker = check_source(
        "fn f(x: i32) -> i32:\n    match x:\n        case 0 if 1:\n            return 0\n    return 1\n",
    );
    assert_eq!(messages(&checker), vec!["Match guard must be bool".to_string()]);
}

#[test]
fn arithmetic_requires_numeric_operands() {
    let checker = check_source("fn f() -> i64:\n    return 1 + \"x\"\n");
    assert_eq!(messages(&checker), vec!["Right operand must be numeric".to_string()]);
}

#[test]
fn bitwise_requires_integers() {
    let checker = check_source("fn f() -> i64:\n    return 1.5 & 2\n");
    assert_eq!(messages(&checker), vec!["Left operand must be integer".to_string()]);
}

#[test]
fn comparisons_yield_bool() {
    let checker = check_source("fn f(a: i32, b: f64) -> bool:\n    return a < b\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn lambda_and_comprehension_types() {
    let checker = check_source(
        "fn f() -> List[i64]:\n    let square = |x: i64| x * x\n    return [square(n) for n in 0..10 if n > 2]\n",
    );
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));
}

#[test]
fn range_bounds_must_be_integers() {
    let checker = check_source("fn f():\n    for i in 1.5..4:\n        print(i)\n");
    assert_eq!(messages(&checker), vec!["Range start must be integer".to_string()]);
}

#[test]
fn ternary_requires_bool_condition() {
    let checker = check_source("fn f() -> i64:\n    return 1 if true else 2\n");
    assert!(!checker.has_errors(), "unexpected errors: {:?}", messages(&checker));

    let checker = check_source("fn f() -> i64:\n    return 1 if 5 else 2\n");
    assert_eq!(messages(&checker), vec!["Condition must be bool".to_string()]);
}
