//! Tree-walking evaluator.
//!
//! Statements execute against a mutable closure and an output context. The
//! `return` signal travels through the `ExecResult` channel: every
//! statement-executing construct propagates it upward and only
//! `exec_method_body` converts it into a value, so a return unwinds exactly
//! to the enclosing method body.

use std::rc::Rc;

use crate::ast::{BinaryOperator, Expression, Program, Statement};
use crate::runtime::{
    self, ClassInstance, Closure, Context, RuntimeError, RuntimeResult, Value,
};

/// Control-flow marker for statement execution.
pub enum ExecResult {
    Continue,
    Return(Value),
}

pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    /// Runs a program against an empty top-level scope, collecting its
    /// output into a String.
    pub fn run(&self, program: &Program) -> RuntimeResult<String> {
        let mut output = String::new();
        let mut context = Context::new(&mut output);
        run_with_context(program, &mut context)?;
        Ok(output)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a program writing output through the given context. Output produced
/// before a runtime failure stays in the sink.
pub fn run_with_context(program: &Program, context: &mut Context) -> RuntimeResult<()> {
    let mut closure = Closure::new();
    match exec_block(&program.statements, &mut closure, context)? {
        ExecResult::Continue => Ok(()),
        ExecResult::Return(_) => Err(RuntimeError::ReturnOutsideMethod),
    }
}

/// Executes a method body, catching the return signal. This is the only
/// catcher: a body that completes without returning yields none.
pub(crate) fn exec_method_body(
    body: &[Statement],
    closure: &mut Closure,
    context: &mut Context,
) -> RuntimeResult<Value> {
    match exec_block(body, closure, context)? {
        ExecResult::Continue => Ok(Value::None),
        ExecResult::Return(value) => Ok(value),
    }
}

fn exec_block(
    body: &[Statement],
    closure: &mut Closure,
    context: &mut Context,
) -> RuntimeResult<ExecResult> {
    for statement in body {
        match exec_statement(statement, closure, context)? {
            ExecResult::Continue => {}
            ExecResult::Return(value) => return Ok(ExecResult::Return(value)),
        }
    }
    Ok(ExecResult::Continue)
}

fn exec_statement(
    statement: &Statement,
    closure: &mut Closure,
    context: &mut Context,
) -> RuntimeResult<ExecResult> {
    match statement {
        Statement::Assignment { name, value } => {
            let value = eval_expression(value, closure, context)?;
            closure.insert(name.clone(), value);
            Ok(ExecResult::Continue)
        }
        Statement::FieldAssignment {
            object,
            field,
            value,
        } => {
            let instance = resolve_instance(object, closure)?;
            let value = eval_expression(value, closure, context)?;
            instance.fields_mut().insert(field.clone(), value);
            Ok(ExecResult::Continue)
        }
        Statement::Print(args) => {
            let mut first = true;
            for arg in args {
                if !first {
                    context.write_str(" ")?;
                }
                first = false;
                let value = eval_expression(arg, closure, context)?;
                value.print(context)?;
            }
            context.write_str("\n")?;
            Ok(ExecResult::Continue)
        }
        Statement::Return(value) => {
            let value = eval_expression(value, closure, context)?;
            Ok(ExecResult::Return(value))
        }
        Statement::ClassDefinition(class) => {
            closure.insert(class.name().to_string(), Value::Class(Rc::clone(class)));
            Ok(ExecResult::Continue)
        }
        Statement::If {
            condition,
            then_body,
            else_body,
        } => {
            let condition = eval_expression(condition, closure, context)?;
            let body = if condition.is_truthy() {
                then_body
            } else {
                else_body
            };
            exec_block(body, closure, context)
        }
        Statement::Expr(expr) => {
            eval_expression(expr, closure, context)?;
            Ok(ExecResult::Continue)
        }
    }
}

fn eval_expression(
    expr: &Expression,
    closure: &mut Closure,
    context: &mut Context,
) -> RuntimeResult<Value> {
    match expr {
        Expression::Number(value) => Ok(Value::Number(*value)),
        Expression::String(value) => Ok(Value::String(value.clone())),
        Expression::Boolean(value) => Ok(Value::Bool(*value)),
        Expression::None => Ok(Value::None),
        Expression::Variable(path) => load_variable(path, closure),
        Expression::NewInstance { class, args } => {
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(eval_expression(arg, closure, context)?);
            }
            let instance = Rc::new(ClassInstance::new(Rc::clone(class)));
            if instance.has_method(runtime::INIT_METHOD, arg_values.len()) {
                ClassInstance::call(&instance, runtime::INIT_METHOD, arg_values, context)?;
            }
            Ok(Value::Instance(instance))
        }
        Expression::MethodCall {
            object,
            method,
            args,
        } => {
            let object = eval_expression(object, closure, context)?;
            // Permissive path: a non-instance receiver or a missing
            // (name, arity) match yields none, silently.
            let Value::Instance(instance) = object else {
                return Ok(Value::None);
            };
            if !instance.has_method(method, args.len()) {
                return Ok(Value::None);
            }
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(eval_expression(arg, closure, context)?);
            }
            ClassInstance::call(&instance, method, arg_values, context)
        }
        Expression::Stringify(argument) => {
            let value = eval_expression(argument, closure, context)?;
            let mut rendered = String::new();
            {
                let mut scratch = Context::new(&mut rendered);
                value.print(&mut scratch)?;
            }
            Ok(Value::String(rendered))
        }
        Expression::BinaryOp { left, op, right } => {
            eval_binary_op(left, *op, right, closure, context)
        }
        Expression::Not(argument) => {
            let value = eval_expression(argument, closure, context)?;
            Ok(Value::Bool(!value.is_truthy()))
        }
    }
}

fn eval_binary_op(
    left: &Expression,
    op: BinaryOperator,
    right: &Expression,
    closure: &mut Closure,
    context: &mut Context,
) -> RuntimeResult<Value> {
    // The logical operators never evaluate the right operand when the
    // result is decided by the left one.
    match op {
        BinaryOperator::Or => {
            let lhs = eval_expression(left, closure, context)?;
            if lhs.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let rhs = eval_expression(right, closure, context)?;
            return Ok(Value::Bool(rhs.is_truthy()));
        }
        BinaryOperator::And => {
            let lhs = eval_expression(left, closure, context)?;
            if !lhs.is_truthy() {
                return Ok(Value::Bool(false));
            }
            let rhs = eval_expression(right, closure, context)?;
            return Ok(Value::Bool(rhs.is_truthy()));
        }
        _ => {}
    }

    let lhs = eval_expression(left, closure, context)?;
    let rhs = eval_expression(right, closure, context)?;
    match op {
        BinaryOperator::Add => eval_add(lhs, rhs, context),
        BinaryOperator::Sub => {
            let (l, r) = numeric_operands("-", &lhs, &rhs)?;
            Ok(Value::Number(l.wrapping_sub(r)))
        }
        BinaryOperator::Mult => {
            let (l, r) = numeric_operands("*", &lhs, &rhs)?;
            Ok(Value::Number(l.wrapping_mul(r)))
        }
        BinaryOperator::Div => {
            let (l, r) = numeric_operands("/", &lhs, &rhs)?;
            if r == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Number(l.wrapping_div(r)))
        }
        BinaryOperator::Equal => Ok(Value::Bool(runtime::equal(&lhs, &rhs, context)?)),
        BinaryOperator::NotEqual => Ok(Value::Bool(runtime::not_equal(&lhs, &rhs, context)?)),
        BinaryOperator::Less => Ok(Value::Bool(runtime::less(&lhs, &rhs, context)?)),
        BinaryOperator::Greater => Ok(Value::Bool(runtime::greater(&lhs, &rhs, context)?)),
        BinaryOperator::LessOrEqual => {
            Ok(Value::Bool(runtime::less_or_equal(&lhs, &rhs, context)?))
        }
        BinaryOperator::GreaterOrEqual => {
            Ok(Value::Bool(runtime::greater_or_equal(&lhs, &rhs, context)?))
        }
        BinaryOperator::Or | BinaryOperator::And => {
            unreachable!("short-circuit operators are handled before operand evaluation")
        }
    }
}

fn eval_add(lhs: Value, rhs: Value, context: &mut Context) -> RuntimeResult<Value> {
    match (&lhs, &rhs) {
        (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l.wrapping_add(*r))),
        (Value::String(l), Value::String(r)) => Ok(Value::String(format!("{l}{r}"))),
        (Value::Instance(instance), _) if instance.has_method(runtime::ADD_METHOD, 1) => {
            ClassInstance::call(instance, runtime::ADD_METHOD, vec![rhs.clone()], context)
        }
        _ => Err(RuntimeError::UnsupportedOperation {
            operation: "+",
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

fn numeric_operands(
    operation: &'static str,
    lhs: &Value,
    rhs: &Value,
) -> RuntimeResult<(i32, i32)> {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(RuntimeError::UnsupportedOperation {
            operation,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

/// Walks a dotted path. The first name resolves in the current closure;
/// every intermediate binding must be a class instance whose field table
/// becomes the next scope.
fn load_variable(path: &[String], closure: &Closure) -> RuntimeResult<Value> {
    let Some((first, rest)) = path.split_first() else {
        return Err(RuntimeError::UndefinedVariable {
            name: String::new(),
        });
    };

    let mut value = closure
        .get(first)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedVariable {
            name: first.clone(),
        })?;
    let mut step = first;
    for name in rest {
        let instance = match &value {
            Value::Instance(instance) => Rc::clone(instance),
            _ => return Err(RuntimeError::NotAnInstance { name: step.clone() }),
        };
        let next = instance.fields().get(name).cloned();
        value = next.ok_or_else(|| RuntimeError::UndefinedVariable { name: name.clone() })?;
        step = name;
    }
    Ok(value)
}

fn resolve_instance(path: &[String], closure: &Closure) -> RuntimeResult<Rc<ClassInstance>> {
    match load_variable(path, closure)? {
        Value::Instance(instance) => Ok(instance),
        _ => Err(RuntimeError::NotAnInstance {
            name: path.last().cloned().unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn run(input: &str) -> String {
        let tokens = tokenize(input).expect("tokenize failed");
        let program = parse_tokens(tokens).expect("parse failed");
        Interpreter::new().run(&program).expect("run failed")
    }

    fn run_err(input: &str) -> RuntimeError {
        let tokens = tokenize(input).expect("tokenize failed");
        let program = parse_tokens(tokens).expect("parse failed");
        Interpreter::new()
            .run(&program)
            .expect_err("expected runtime failure")
    }

    #[test]
    fn return_exits_method_without_executing_remaining_body() {
        let input = indoc! {"
            class A:
              def f():
                return 7
                print 'unreachable'

            a = A()
            print a.f()
        "};
        assert_eq!(run(input), "7\n");
    }

    #[test]
    fn return_propagates_through_nested_if() {
        let input = indoc! {"
            class A:
              def sign(n):
                if n < 0:
                  return -1
                else:
                  if n == 0:
                    return 0
                return 1

            a = A()
            print a.sign(-5), a.sign(0), a.sign(9)
        "};
        assert_eq!(run(input), "-1 0 1\n");
    }

    #[test]
    fn method_without_return_yields_none() {
        let input = indoc! {"
            class A:
              def f():
                x = 1

            a = A()
            print a.f()
        "};
        assert_eq!(run(input), "None\n");
    }

    #[test]
    fn init_binds_fields_on_the_new_instance() {
        let input = indoc! {"
            class Point:
              def __init__(x, y):
                self.x = x
                self.y = y

            p = Point(3, 4)
            print p.x, p.y
        "};
        assert_eq!(run(input), "3 4\n");
    }

    #[test]
    fn construction_without_matching_init_skips_it() {
        let input = indoc! {"
            class A:
              def __init__(a):
                self.a = a

            x = A()
            print 'made it'
        "};
        assert_eq!(run(input), "made it\n");
    }

    #[test]
    fn instances_are_shared_by_handle() {
        let input = indoc! {"
            class Counter:
              def __init__():
                self.value = 0

              def add():
                self.value = self.value + 1

            x = Counter()
            y = x
            x.add()
            y.add()
            print x.value, y.value
        "};
        assert_eq!(run(input), "2 2\n");
    }

    #[test]
    fn method_locals_do_not_see_the_top_level_scope() {
        let input = indoc! {"
            g = 1
            class A:
              def f():
                return g

            a = A()
            x = a.f()
        "};
        assert_eq!(
            run_err(input),
            RuntimeError::UndefinedVariable {
                name: "g".to_string()
            }
        );
    }

    #[test]
    fn method_locals_do_not_leak_into_the_top_level_scope() {
        let input = indoc! {"
            class A:
              def f():
                local = 1

            a = A()
            a.f()
            print local
        "};
        assert_eq!(
            run_err(input),
            RuntimeError::UndefinedVariable {
                name: "local".to_string()
            }
        );
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        let input = indoc! {"
            class Z:
              def f():
                print 'NO'
                return True

            z = Z()
            x = True or z.f()
            y = False and z.f()
            print x, y
        "};
        assert_eq!(run(input), "True False\n");
    }

    #[test]
    fn logical_operators_return_bools_not_operands() {
        assert_eq!(run("print 2 or 0\nprint 0 or 2\nprint 2 and 3\n"), "True\nTrue\nTrue\n");
        assert_eq!(run("print 0 and 2\nprint not 2, not 0\n"), "False\nFalse True\n");
    }

    #[test]
    fn division_by_zero_errors() {
        assert_eq!(run_err("print 1 / 0\n"), RuntimeError::DivisionByZero);
    }

    #[test]
    fn arithmetic_on_mixed_types_errors() {
        assert_eq!(
            run_err("x = 1 + 'a'\n"),
            RuntimeError::UnsupportedOperation {
                operation: "+",
                lhs: "Number",
                rhs: "String",
            }
        );
        assert_eq!(
            run_err("x = 'a' * 2\n"),
            RuntimeError::UnsupportedOperation {
                operation: "*",
                lhs: "String",
                rhs: "Number",
            }
        );
    }

    #[test]
    fn string_addition_concatenates() {
        assert_eq!(run("print 'foo' + 'bar'\n"), "foobar\n");
    }

    #[test]
    fn add_dispatches_to_dunder_on_instances() {
        let input = indoc! {"
            class Money:
              def __init__(amount):
                self.amount = amount

              def __add__(other):
                return self.amount + other.amount

            total = Money(3) + Money(4)
            print total
        "};
        assert_eq!(run(input), "7\n");
    }

    #[test]
    fn comparison_dispatches_to_dunders_on_instances() {
        let input = indoc! {"
            class Money:
              def __init__(amount):
                self.amount = amount

              def __eq__(other):
                return self.amount == other.amount

              def __lt__(other):
                return self.amount < other.amount

            a = Money(3)
            b = Money(4)
            print a == b, a != b, a < b, a > b, a <= b, a >= b
        "};
        assert_eq!(run(input), "False True True False True False\n");
    }

    #[test]
    fn inherited_methods_dispatch_through_the_parent_chain() {
        let input = indoc! {"
            class Animal:
              def describe():
                return 'generic animal'

              def name():
                return 'animal'

            class Dog(Animal):
              def name():
                return 'dog'

            d = Dog()
            print d.describe(), d.name()
        "};
        assert_eq!(run(input), "generic animal dog\n");
    }

    #[test]
    fn overloads_by_arity_are_both_callable() {
        let input = indoc! {"
            class X:
              def f(a):
                return 1

              def f(a, b):
                return 2

            x = X()
            print x.f(0), x.f(0, 0)
        "};
        assert_eq!(run(input), "1 2\n");
    }

    #[test]
    fn stringify_renders_values_and_none() {
        let input = indoc! {"
            print str(5) + str(None)
            print str('x') + 'y'
            print str(True)
        "};
        assert_eq!(run(input), "5None\nxy\nTrue\n");
    }

    #[test]
    fn stringify_uses_str_method_on_instances() {
        let input = indoc! {"
            class Named:
              def __str__():
                return 'named'

            n = Named()
            print str(n) + '!'
        "};
        assert_eq!(run(input), "named!\n");
    }

    #[test]
    fn method_calls_on_non_instances_are_silent() {
        let input = indoc! {"
            x = 123
            x.f()
            print 'still running'
        "};
        assert_eq!(run(input), "still running\n");
    }

    #[test]
    fn method_calls_with_unmatched_arity_are_silent() {
        let input = indoc! {"
            class Sink:
              def apply():
                ignored = 0

            sink = Sink()
            print sink.apply(1)
        "};
        assert_eq!(run(input), "None\n");
    }

    #[test]
    fn field_assignment_on_non_instance_errors() {
        assert_eq!(
            run_err("a = 123\na.b = 456\n"),
            RuntimeError::NotAnInstance {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn field_read_on_non_instance_errors() {
        assert_eq!(
            run_err("a = 123\nprint a.b\n"),
            RuntimeError::NotAnInstance {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn reading_an_unbound_variable_errors() {
        assert_eq!(
            run_err("print missing\n"),
            RuntimeError::UndefinedVariable {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn return_at_top_level_errors() {
        assert_eq!(run_err("return 1\n"), RuntimeError::ReturnOutsideMethod);
    }

    #[test]
    fn print_interleaves_output_with_argument_evaluation() {
        let input = indoc! {"
            class Loud:
              def speak():
                print 'speaking'
                return 3

            loud = Loud()
            print 1, loud.speak(), 2
        "};
        assert_eq!(run(input), "1 speaking\n3 2\n");
    }

    #[test]
    fn if_without_else_yields_nothing_when_false() {
        let input = indoc! {"
            if False:
              print 'skipped'
            print 'after'
        "};
        assert_eq!(run(input), "after\n");
    }

    #[test]
    fn assignment_overwrites_existing_bindings() {
        let input = indoc! {"
            x = 1
            x = 'two'
            print x
        "};
        assert_eq!(run(input), "two\n");
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        assert_eq!(run("print 36 / 4 / 3, 7 / 2, -7 / 2\n"), "3 3 -3\n");
    }

    #[test]
    fn class_values_print_by_name() {
        let input = indoc! {"
            class A:
              def f():
                return 1

            print A
        "};
        assert_eq!(run(input), "Class A\n");
    }

    #[test]
    fn wrapping_arithmetic_never_panics() {
        assert_eq!(
            run("print 2147483647 + 1\n"),
            format!("{}\n", i32::MIN)
        );
    }
}
