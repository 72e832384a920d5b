//! Intermediate representation of generated code.
//!
//! Builders describe *what* to emit as a small tree of [`Declaration`],
//! [`Stmt`] and [`Expr`] nodes; a [`Printer`](super::printer::Printer)
//! decides how it looks in the target language. Only the splice into the
//! hand-written template stays textual.

/// Binary operators used by the builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Assign,
    Eq,
    Ne,
    Lt,
    Or,
    Add,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Verbatim target-language text (criteria expressions, literals).
    Raw(String),
    /// A plain identifier.
    Ident(String),
    /// A string literal; the printer escapes it.
    Str(String),
    /// `base[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `base.member`
    Member(Box<Expr>, String),
    /// `base->member`
    Arrow(Box<Expr>, String),
    /// `callee(args)`
    Call(Box<Expr>, Vec<Expr>),
    /// `dynamic_cast<ty>(expr)`
    DynamicCast(String, Box<Expr>),
    /// `&expr`
    AddressOf(Box<Expr>),
    /// `lhs op rhs`
    Binary(Box<Expr>, BinOp, Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    pub fn str(text: impl Into<String>) -> Self {
        Expr::Str(text.into())
    }

    /// Free function call.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(Expr::Ident(name.into())), args)
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index(Box::new(self), Box::new(index))
    }

    /// `self["key"]`
    pub fn key(self, key: &str) -> Self {
        self.index(Expr::str(key))
    }

    /// Walk a JSON key path: `self["a"]["b"]`.
    pub fn path(self, keys: &[String]) -> Self {
        keys.iter().fold(self, |acc, key| acc.key(key))
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member(Box::new(self), name.into())
    }

    pub fn arrow(self, name: impl Into<String>) -> Self {
        Expr::Arrow(Box::new(self), name.into())
    }

    /// `self.name(args)`
    pub fn method(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(self.member(name)), args)
    }

    /// `self->name(args)`
    pub fn arrow_call(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(self.arrow(name)), args)
    }

    pub fn dynamic_cast(ty: impl Into<String>, expr: Expr) -> Self {
        Expr::DynamicCast(ty.into(), Box::new(expr))
    }

    pub fn address_of(self) -> Self {
        Expr::AddressOf(Box::new(self))
    }

    fn binary(self, op: BinOp, rhs: Expr) -> Self {
        Expr::Binary(Box::new(self), op, Box::new(rhs))
    }

    pub fn assign(self, rhs: Expr) -> Self {
        self.binary(BinOp::Assign, rhs)
    }

    pub fn equals(self, rhs: Expr) -> Self {
        self.binary(BinOp::Eq, rhs)
    }

    pub fn not_equals(self, rhs: Expr) -> Self {
        self.binary(BinOp::Ne, rhs)
    }

    pub fn less_than(self, rhs: Expr) -> Self {
        self.binary(BinOp::Lt, rhs)
    }

    pub fn or(self, rhs: Expr) -> Self {
        self.binary(BinOp::Or, rhs)
    }

    pub fn plus(self, rhs: Expr) -> Self {
        self.binary(BinOp::Add, rhs)
    }
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression statement.
    Expr(Expr),
    /// Local declaration with optional initializer.
    Let {
        ty: String,
        name: String,
        init: Option<Expr>,
    },
    /// Conditional; an `otherwise` holding a single `If` prints as `else if`.
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    /// Counting loop `for (size_t var = 0; var < bound; var++)`.
    For {
        var: String,
        bound: Expr,
        body: Vec<Stmt>,
    },
    /// Exception guard around `body`.
    Try {
        body: Vec<Stmt>,
        catch: String,
        handler: Vec<Stmt>,
    },
    Return(Option<Expr>),
    /// Nested scope.
    Block(Vec<Stmt>),
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn if_then(cond: Expr, then: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then,
            otherwise: Vec::new(),
        }
    }

    pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then,
            otherwise,
        }
    }

    pub fn let_(ty: impl Into<String>, name: impl Into<String>, init: Expr) -> Self {
        Stmt::Let {
            ty: ty.into(),
            name: name.into(),
            init: Some(init),
        }
    }

    pub fn for_each(var: impl Into<String>, bound: Expr, body: Vec<Stmt>) -> Self {
        Stmt::For {
            var: var.into(),
            bound,
            body,
        }
    }

    pub fn ret(expr: Expr) -> Self {
        Stmt::Return(Some(expr))
    }
}

/// A function or method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: String,
    pub name: String,
}

impl Param {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Param {
            ty: ty.into(),
            name: name.into(),
        }
    }
}

/// A documented data member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub doc: Vec<String>,
    pub ty: String,
    pub name: String,
}

/// A documented method declaration inside a class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub doc: Vec<String>,
    pub ret: String,
    pub name: String,
    pub params: Vec<Param>,
    pub overrides: bool,
}

/// A function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub ret: String,
    /// Name as written at the definition site (possibly qualified).
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

/// A top-level or class-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// Free-standing documentation block.
    Doc(Vec<String>),
    Field(FieldDecl),
    Method(MethodDecl),
    Function(FunctionDef),
}
