use crate::ast::{Expr, LiteralValue, Program, Stmt};
use crate::token::Keyword;
use crate::value::format_number;

/// Renders the syntax tree in a parenthesised prefix form, one top‑level
/// statement per line.  Binary nodes make the left‑to‑right folding
/// visible: `1 + 2 * 3` prints as `(* (+ 1 2) 3)`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::Number(n) => format_number(*n),

                LiteralValue::Str(s) => format!("\"{}\"", s),
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary {
                operator, operand, ..
            } => format!("({} {})", operator.symbol(), Self::print(operand)),

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => format!(
                "({} {} {})",
                operator.symbol(),
                Self::print(left),
                Self::print(right)
            ),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.clone(),

            Expr::Assign { name, value, .. } => format!("(= {} {})", name, Self::print(value)),

            Expr::Call {
                name, arguments, ..
            } => {
                let mut s = format!("(call {}", name);
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(expr {})", Self::print(expr)),

            Stmt::Print(expr) => format!("({} {})", Keyword::Print.as_str(), Self::print(expr)),

            Stmt::VarDecl {
                name,
                initializer,
                constant,
                ..
            } => {
                let keyword = if *constant {
                    Keyword::Constant
                } else {
                    Keyword::Variable
                };

                format!("({} {} {})", keyword.as_str(), name, Self::print(initializer))
            }

            Stmt::Block(statements) => Self::sequence("block", statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut s = format!(
                    "({} {} {}",
                    Keyword::If.as_str(),
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                );
                if let Some(else_branch) = else_branch {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(else_branch));
                }
                s.push(')');
                s
            }

            Stmt::Loop { condition, body } => format!(
                "({} {} {})",
                Keyword::Loop.as_str(),
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => {
                let head = format!(
                    "{} {} ({})",
                    Keyword::Function.as_str(),
                    decl.name,
                    decl.params.join(" ")
                );

                Self::sequence(&head, &decl.body)
            }

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("({} {})", Keyword::Return.as_str(), Self::print(expr)),
                None => format!("({})", Keyword::Return.as_str()),
            },
        }
    }

    pub fn print_program(program: &Program) -> String {
        program
            .statements
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sequence(head: &str, statements: &[Stmt]) -> String {
        let mut s = format!("({}", head);
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }
}
