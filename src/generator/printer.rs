//! Rendering of the code IR into target-language text.

use super::ir::{BinOp, Declaration, Expr, FunctionDef, Param, Stmt};

/// Renders IR nodes as text in one target language.
///
/// `depth` is the indentation level of the node being printed; every
/// rendered statement or declaration ends with a newline.
pub trait Printer {
    fn expr(&self, expr: &Expr) -> String;

    fn stmt(&self, stmt: &Stmt, depth: usize) -> String;

    fn declaration(&self, decl: &Declaration, depth: usize) -> String;

    fn stmts(&self, stmts: &[Stmt], depth: usize) -> String {
        stmts.iter().map(|s| self.stmt(s, depth)).collect()
    }

    /// Declarations separated by one blank line.
    fn declarations(&self, decls: &[Declaration], depth: usize) -> String {
        decls
            .iter()
            .map(|d| self.declaration(d, depth))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// C++ printer: two-space indentation, braces on their own lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppPrinter;

impl CppPrinter {
    const INDENT: &'static str = "  ";

    fn pad(depth: usize) -> String {
        Self::INDENT.repeat(depth)
    }

    fn params(params: &[Param]) -> String {
        params
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn braced(&self, head: &str, body: &[Stmt], depth: usize) -> String {
        let pad = Self::pad(depth);
        format!("{pad}{head}\n{pad}{{\n{}{pad}}}\n", self.stmts(body, depth + 1))
    }

    fn if_chain(&self, cond: &Expr, then: &[Stmt], otherwise: &[Stmt], depth: usize, keyword: &str) -> String {
        let pad = Self::pad(depth);
        let mut out = self.braced(&format!("{keyword} ({})", self.expr(cond)), then, depth);
        match otherwise {
            [] => {}
            [Stmt::If {
                cond,
                then,
                otherwise,
            }] => out.push_str(&self.if_chain(cond, then, otherwise, depth, "else if")),
            body => {
                out.push_str(&format!("{pad}else\n{pad}{{\n{}{pad}}}\n", self.stmts(body, depth + 1)));
            }
        }
        out
    }

    fn doc(lines: &[String], depth: usize) -> String {
        if lines.is_empty() {
            return String::new();
        }
        let pad = Self::pad(depth);
        let mut out = format!("{pad}/**\n");
        // Descriptor text must not terminate the comment early
        for line in lines.iter().flat_map(|l| l.split('\n')).map(|l| l.replace("*/", "* /")) {
            if line.is_empty() {
                out.push_str(&format!("{pad}*\n"));
            } else {
                out.push_str(&format!("{pad}* {line}\n"));
            }
        }
        out.push_str(&format!("{pad}*/\n"));
        out
    }

    /// Operand of a binary operator; nested operators are parenthesized
    /// unless they continue the same associative chain.
    fn operand(&self, expr: &Expr, parent: BinOp) -> String {
        match expr {
            Expr::Binary(_, op, _) if *op == parent && matches!(op, BinOp::Or | BinOp::Add) => {
                self.expr(expr)
            }
            Expr::Binary(..) => format!("({})", self.expr(expr)),
            _ => self.expr(expr),
        }
    }

    /// Receiver of a postfix operator (`[]`, `.`, `->`, call).
    fn receiver(&self, expr: &Expr) -> String {
        match expr {
            Expr::Binary(..) | Expr::AddressOf(_) => format!("({})", self.expr(expr)),
            _ => self.expr(expr),
        }
    }

    fn function(&self, def: &FunctionDef, depth: usize) -> String {
        let head = format!("{} {}({})", def.ret, def.name, Self::params(&def.params));
        self.braced(&head, &def.body, depth)
    }
}

/// Escape text for a C++ string literal.
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

impl Printer for CppPrinter {
    fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Raw(text) => text.clone(),
            Expr::Ident(name) => name.clone(),
            Expr::Str(text) => format!("\"{}\"", escape_string(text)),
            Expr::Index(base, index) => format!("{}[{}]", self.receiver(base), self.expr(index)),
            Expr::Member(base, name) => format!("{}.{name}", self.receiver(base)),
            Expr::Arrow(base, name) => format!("{}->{name}", self.receiver(base)),
            Expr::Call(callee, args) => {
                let args = args.iter().map(|a| self.expr(a)).collect::<Vec<_>>().join(", ");
                format!("{}({args})", self.receiver(callee))
            }
            Expr::DynamicCast(ty, inner) => format!("dynamic_cast<{ty}>({})", self.expr(inner)),
            Expr::AddressOf(inner) => format!("&{}", self.receiver(inner)),
            Expr::Binary(lhs, BinOp::Assign, rhs) => {
                format!("{} = {}", self.expr(lhs), self.expr(rhs))
            }
            Expr::Binary(lhs, op, rhs) => {
                let symbol = match op {
                    BinOp::Eq => "==",
                    BinOp::Ne => "!=",
                    BinOp::Lt => "<",
                    BinOp::Or => "||",
                    BinOp::Add => "+",
                    BinOp::Assign => "=",
                };
                format!(
                    "{} {symbol} {}",
                    self.operand(lhs, *op),
                    self.operand(rhs, *op)
                )
            }
        }
    }

    fn stmt(&self, stmt: &Stmt, depth: usize) -> String {
        let pad = Self::pad(depth);
        match stmt {
            Stmt::Expr(expr) => format!("{pad}{};\n", self.expr(expr)),
            Stmt::Let { ty, name, init } => match init {
                Some(init) => format!("{pad}{ty} {name} = {};\n", self.expr(init)),
                None => format!("{pad}{ty} {name};\n"),
            },
            Stmt::If {
                cond,
                then,
                otherwise,
            } => self.if_chain(cond, then, otherwise, depth, "if"),
            Stmt::For { var, bound, body } => {
                let head = format!("for (size_t {var} = 0; {var} < {}; {var}++)", self.expr(bound));
                self.braced(&head, body, depth)
            }
            Stmt::Try {
                body,
                catch,
                handler,
            } => {
                let mut out = self.braced("try", body, depth);
                out.push_str(&self.braced(&format!("catch ({catch})"), handler, depth));
                out
            }
            Stmt::Return(None) => format!("{pad}return;\n"),
            Stmt::Return(Some(expr)) => format!("{pad}return {};\n", self.expr(expr)),
            Stmt::Block(body) => format!("{pad}{{\n{}{pad}}}\n", self.stmts(body, depth + 1)),
        }
    }

    fn declaration(&self, decl: &Declaration, depth: usize) -> String {
        let pad = Self::pad(depth);
        match decl {
            Declaration::Doc(lines) => Self::doc(lines, depth),
            Declaration::Field(field) => {
                format!("{}{pad}{} {};\n", Self::doc(&field.doc, depth), field.ty, field.name)
            }
            Declaration::Method(method) => format!(
                "{}{pad}{} {}({}){};\n",
                Self::doc(&method.doc, depth),
                method.ret,
                method.name,
                Self::params(&method.params),
                if method.overrides { " override" } else { "" }
            ),
            Declaration::Function(def) => self.function(def, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ir::{FieldDecl, MethodDecl};

    #[test]
    fn test_expr_chains() {
        let p = CppPrinter;
        let js = Expr::ident("js").key("Population Size");
        assert_eq!(p.expr(&js), "js[\"Population Size\"]");

        let call = Expr::ident("js").key("A").method("get<int>", vec![]);
        assert_eq!(p.expr(&call), "js[\"A\"].get<int>()");

        let arrow = Expr::ident("_k").arrow("_variables").index(Expr::ident("i")).arrow("_lowerBound");
        assert_eq!(p.expr(&arrow), "_k->_variables[i]->_lowerBound");
    }

    #[test]
    fn test_binary_parenthesizes_nested_operands() {
        let p = CppPrinter;
        let cond = Expr::ident("a").equals(Expr::raw("1")).or(Expr::ident("b"));
        assert_eq!(p.expr(&cond), "(a == 1) || b");
        let assign = Expr::ident("x").assign(Expr::ident("x").or(Expr::ident("y")));
        assert_eq!(p.expr(&assign), "x = x || y");
        let chain = Expr::str("a").plus(Expr::ident("b")).plus(Expr::str("."));
        assert_eq!(p.expr(&chain), "\"a\" + b + \".\"");
    }

    #[test]
    fn test_string_escaping() {
        let p = CppPrinter;
        assert_eq!(
            p.expr(&Expr::str("Key: [\"A\"]\n%s")),
            "\"Key: [\\\"A\\\"]\\n%s\""
        );
    }

    #[test]
    fn test_if_else_if_chain() {
        let p = CppPrinter;
        let stmt = Stmt::if_else(
            Expr::ident("a"),
            vec![Stmt::ret(Expr::raw("1"))],
            vec![Stmt::if_else(
                Expr::ident("b"),
                vec![Stmt::ret(Expr::raw("2"))],
                vec![Stmt::ret(Expr::raw("3"))],
            )],
        );
        let expected = "\
if (a)
{
  return 1;
}
else if (b)
{
  return 2;
}
else
{
  return 3;
}
";
        assert_eq!(p.stmt(&stmt, 0), expected);
    }

    #[test]
    fn test_for_and_try() {
        let p = CppPrinter;
        let stmt = Stmt::for_each(
            "i",
            Expr::ident("v").method("size", vec![]),
            vec![Stmt::Try {
                body: vec![Stmt::expr(Expr::call("f", vec![Expr::ident("i")]))],
                catch: "const std::exception& e".to_string(),
                handler: vec![Stmt::Return(None)],
            }],
        );
        let out = p.stmt(&stmt, 1);
        assert!(out.starts_with("  for (size_t i = 0; i < v.size(); i++)\n  {\n"));
        assert!(out.contains("    try\n    {\n      f(i);\n    }\n"));
        assert!(out.contains("    catch (const std::exception& e)\n    {\n      return;\n    }\n"));
    }

    #[test]
    fn test_field_and_method_declarations() {
        let p = CppPrinter;
        let field = Declaration::Field(FieldDecl {
            doc: vec!["@brief Number of samples per generation.".to_string()],
            ty: "int".to_string(),
            name: "_populationSize".to_string(),
        });
        assert_eq!(
            p.declaration(&field, 1),
            "  /**\n  * @brief Number of samples per generation.\n  */\n  int _populationSize;\n"
        );

        let method = Declaration::Method(MethodDecl {
            doc: Vec::new(),
            ret: "void".to_string(),
            name: "setConfiguration".to_string(),
            params: vec![Param::new("knlohmann::json&", "js")],
            overrides: true,
        });
        assert_eq!(
            p.declaration(&method, 0),
            "void setConfiguration(knlohmann::json& js) override;\n"
        );
    }

    #[test]
    fn test_doc_lines_cannot_close_the_comment() {
        let doc = Declaration::Doc(vec![
            "@brief Ratio */ int broken; /* of".to_string(),
            "first\nsecond".to_string(),
        ]);
        assert_eq!(
            CppPrinter.declaration(&doc, 0),
            "/**\n* @brief Ratio * / int broken; /* of\n* first\n* second\n*/\n"
        );
    }
}
