//! Parser from lexemes into the Quill syntax tree
use crate::ast::*;
use crate::lex::{lex, Chunk, Lexeme, Token};
use crate::{Error, Result};
use std::sync::Arc;

/// Words that cannot be used as binding names or bare identifiers
const RESERVED: &[&str] = &[
    "break", "catch", "const", "continue", "else", "false", "finally", "for", "function", "if",
    "let", "new", "null", "return", "throw", "true", "try", "typeof", "var", "while",
];

/// Nesting allowed for statements and expressions
const MAX_NESTING: usize = 256;

/// Longest chain of binary operators, member accesses or calls in one expression
const MAX_CHAIN: usize = 1024;

/// Parse snippet text as a sequence of statements
pub fn parse(text: &str) -> Result<Vec<Stmt>> {
    let mut parser = Parser::new(lex(text)?);
    let mut stmts = vec![];
    while !parser.at_end() {
        stmts.push(parser.statement()?);
    }
    Ok(stmts)
}

/// Parse text that must contain exactly one expression
pub fn parse_expr(text: &str) -> Result<Expr> {
    expr_at(text, 0)
}

/// Parse a single expression nested `depth` levels into enclosing source
fn expr_at(text: &str, depth: usize) -> Result<Expr> {
    let mut parser = Parser::new(lex(text)?);
    parser.depth = depth;
    let expr = parser.expression()?;
    if !parser.at_end() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

struct Parser {
    lexemes: Vec<Lexeme>,
    pos: usize,
    depth: usize,
}

enum BinTok {
    Bin(BinaryOp),
    Log(LogicalOp),
}

impl Parser {
    fn new(lexemes: Vec<Lexeme>) -> Self {
        Parser {
            lexemes,
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.lexemes.get(self.pos + offset).map(|l| &l.token)
    }

    fn bump(&mut self) -> Option<Token> {
        let lexeme = self.lexemes.get(self.pos)?;
        self.pos += 1;
        Some(lexeme.token.clone())
    }

    fn line(&self) -> usize {
        self.lexemes
            .get(self.pos)
            .or_else(|| self.lexemes.last())
            .map(|l| l.line)
            .unwrap_or(1)
    }

    fn newline_before(&self) -> bool {
        self.lexemes
            .get(self.pos)
            .map(|l| l.newline_before)
            .unwrap_or(true)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(q)) if *q == p)
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i == w)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.is_word(w) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn err(&self, msg: impl std::fmt::Display) -> Error {
        Error::Syntax(format!("{msg} (line {})", self.line()))
    }

    fn unexpected(&self) -> Error {
        match self.peek() {
            Some(t) => self.err(format!("Unexpected token {t}")),
            None => self.err("Unexpected end of input"),
        }
    }

    /// Consume a statement terminator, allowing automatic insertion at line ends
    fn end_statement(&mut self) -> Result<()> {
        if self.eat_punct(";") || self.is_punct("}") || self.at_end() || self.newline_before() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(name)) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Property names after `.` may be any identifier, including keywords
    fn property_name(&mut self) -> Result<String> {
        match self.bump() {
            Some(Token::Ident(name)) => Ok(name),
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    /// Run `f` one nesting level deeper
    fn nested<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.depth >= MAX_NESTING {
            return Err(self.err("Maximum nesting depth exceeded"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Count one more link of a left-nested chain
    fn link(&self, links: &mut usize) -> Result<()> {
        *links += 1;
        if *links > MAX_CHAIN {
            return Err(self.err("Expression chain is too long"));
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<Stmt> {
        self.nested(Self::statement_body)
    }

    fn statement_body(&mut self) -> Result<Stmt> {
        let word = match self.peek() {
            Some(Token::Ident(w)) => w.clone(),
            Some(Token::Punct("{")) => return Ok(Stmt::Block(self.block()?)),
            Some(Token::Punct(";")) => {
                self.pos += 1;
                return Ok(Stmt::Empty);
            }
            _ => String::new(),
        };

        match word.as_str() {
            "const" | "let" | "var" => {
                let decl = self.declaration()?;
                self.end_statement()?;
                Ok(decl)
            }
            "function" if matches!(self.peek_at(1), Some(Token::Ident(_))) => {
                self.pos += 1;
                let name = self.identifier()?;
                let func = self.function_rest(Some(name))?;
                Ok(Stmt::Func(Arc::new(func)))
            }
            "return" => {
                self.pos += 1;
                let value = if self.eat_punct(";")
                    || self.is_punct("}")
                    || self.at_end()
                    || self.newline_before()
                {
                    None
                } else {
                    let e = self.expression()?;
                    self.end_statement()?;
                    Some(e)
                };
                Ok(Stmt::Return(value))
            }
            "throw" => {
                self.pos += 1;
                if self.newline_before() {
                    return Err(self.err("Illegal newline after throw"));
                }
                let e = self.expression()?;
                self.end_statement()?;
                Ok(Stmt::Throw(e))
            }
            "if" => {
                self.pos += 1;
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let then = Box::new(self.statement()?);
                let alt = if self.eat_word("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If(test, then, alt))
            }
            "while" => {
                self.pos += 1;
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                Ok(Stmt::While(test, Box::new(self.statement()?)))
            }
            "for" => self.for_statement(),
            "break" => {
                self.pos += 1;
                self.end_statement()?;
                Ok(Stmt::Break)
            }
            "continue" => {
                self.pos += 1;
                self.end_statement()?;
                Ok(Stmt::Continue)
            }
            "try" => self.try_statement(),
            _ => {
                let e = self.expression()?;
                self.end_statement()?;
                Ok(Stmt::Expr(e))
            }
        }
    }

    fn decl_kind(&mut self) -> Result<DeclKind> {
        let kind = match self.peek() {
            Some(Token::Ident(w)) if w == "const" => DeclKind::Const,
            Some(Token::Ident(w)) if w == "let" => DeclKind::Let,
            Some(Token::Ident(w)) if w == "var" => DeclKind::Var,
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(kind)
    }

    fn declaration(&mut self) -> Result<Stmt> {
        let kind = self.decl_kind()?;
        self.declarators(kind)
    }

    fn declarators(&mut self, kind: DeclKind) -> Result<Stmt> {
        let mut decls = vec![];
        loop {
            let pattern = self.binding_pattern()?;
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            if init.is_none() && (kind == DeclKind::Const || !matches!(pattern, Pattern::Ident(_)))
            {
                return Err(self.err("Missing initializer in declaration"));
            }
            decls.push((pattern, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::Decl(kind, decls))
    }

    fn binding_pattern(&mut self) -> Result<Pattern> {
        if self.eat_punct("{") {
            let mut props = vec![];
            while !self.eat_punct("}") {
                let key = match self.bump() {
                    Some(Token::Ident(k)) | Some(Token::Str(k)) => k,
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    }
                };
                let target = if self.eat_punct(":") {
                    self.binding_pattern()?
                } else {
                    if RESERVED.contains(&key.as_str()) {
                        return Err(self.err(format!("Unexpected token {key}")));
                    }
                    Pattern::Ident(key.clone())
                };
                let default = if self.eat_punct("=") {
                    Some(self.assignment()?)
                } else {
                    None
                };
                props.push(PatternProp {
                    key,
                    target,
                    default,
                });
                if !self.eat_punct(",") {
                    self.expect_punct("}")?;
                    break;
                }
            }
            return Ok(Pattern::Object(props));
        }

        if self.eat_punct("[") {
            let mut elems = vec![];
            while !self.eat_punct("]") {
                if self.eat_punct(",") {
                    elems.push(None);
                    continue;
                }
                let target = self.binding_pattern()?;
                let default = if self.eat_punct("=") {
                    Some(self.assignment()?)
                } else {
                    None
                };
                elems.push(Some(PatternElem { target, default }));
                if !self.eat_punct(",") {
                    self.expect_punct("]")?;
                    break;
                }
            }
            return Ok(Pattern::Array(elems));
        }

        Ok(Pattern::Ident(self.identifier()?))
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.pos += 1;
        self.expect_punct("(")?;

        let init = if self.eat_punct(";") {
            None
        } else if self.is_word("const") || self.is_word("let") || self.is_word("var") {
            let kind = self.decl_kind()?;
            let save = self.pos;
            let pattern = self.binding_pattern()?;
            if self.eat_word("of") {
                let iter = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::ForOf {
                    kind,
                    pattern,
                    iter,
                    body,
                });
            }
            self.pos = save;
            let decl = self.declarators(kind)?;
            self.expect_punct(";")?;
            Some(Box::new(decl))
        } else {
            let e = self.expression()?;
            self.expect_punct(";")?;
            Some(Box::new(Stmt::Expr(e)))
        };

        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> Result<Stmt> {
        self.pos += 1;
        let body = self.block()?;
        let (param, handler) = if self.eat_word("catch") {
            let param = if self.eat_punct("(") {
                let p = self.binding_pattern()?;
                self.expect_punct(")")?;
                Some(p)
            } else {
                None
            };
            (param, Some(self.block()?))
        } else {
            (None, None)
        };
        let finalizer = if self.eat_word("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.err("Missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            body,
            param,
            handler,
            finalizer,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut stmts = vec![];
        while !self.eat_punct("}") {
            if self.at_end() {
                return Err(self.unexpected());
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        self.nested(Self::assignment_body)
    }

    fn assignment_body(&mut self) -> Result<Expr> {
        if self.is_arrow_start() {
            return self.arrow_function();
        }

        let lhs = self.conditional()?;
        let op = match self.peek() {
            Some(Token::Punct("=")) => AssignOp::Assign,
            Some(Token::Punct("+=")) => AssignOp::Add,
            Some(Token::Punct("-=")) => AssignOp::Sub,
            Some(Token::Punct("*=")) => AssignOp::Mul,
            Some(Token::Punct("/=")) => AssignOp::Div,
            Some(Token::Punct("%=")) => AssignOp::Rem,
            _ => return Ok(lhs),
        };
        if !matches!(lhs, Expr::Ident(_) | Expr::Member { optional: false, .. }) {
            return Err(self.err("Invalid left-hand side in assignment"));
        }
        self.pos += 1;
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(lhs),
            value: Box::new(value),
        })
    }

    /// Whether the upcoming tokens start an arrow function
    fn is_arrow_start(&self) -> bool {
        match self.peek() {
            Some(Token::Ident(name)) if !RESERVED.contains(&name.as_str()) => {
                matches!(self.peek_at(1), Some(Token::Punct("=>")))
            }
            Some(Token::Punct("(")) => {
                let mut depth = 0usize;
                for (i, lexeme) in self.lexemes[self.pos..].iter().enumerate() {
                    match lexeme.token {
                        Token::Punct("(") | Token::Punct("[") | Token::Punct("{") => depth += 1,
                        Token::Punct(")") | Token::Punct("]") | Token::Punct("}") => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(
                                    self.peek_at(i + 1),
                                    Some(Token::Punct("=>"))
                                );
                            }
                        }
                        _ => (),
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn arrow_function(&mut self) -> Result<Expr> {
        let params = if self.is_punct("(") {
            self.params()?
        } else {
            vec![Param {
                pattern: Pattern::Ident(self.identifier()?),
                default: None,
                rest: false,
            }]
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            FuncBody::Block(self.block()?)
        } else {
            FuncBody::Expr(Box::new(self.assignment()?))
        };
        Ok(Expr::Function(Arc::new(Function {
            name: None,
            params,
            body,
        })))
    }

    fn params(&mut self) -> Result<Vec<Param>> {
        self.expect_punct("(")?;
        let mut params = vec![];
        while !self.eat_punct(")") {
            let rest = self.eat_punct("...");
            let pattern = self.binding_pattern()?;
            let default = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                default,
                rest,
            });
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    /// Parameters and body of a `function` after its name
    fn function_rest(&mut self, name: Option<String>) -> Result<Function> {
        let params = self.params()?;
        let body = FuncBody::Block(self.block()?);
        Ok(Function { name, params, body })
    }

    fn conditional(&mut self) -> Result<Expr> {
        let test = self.binary(1)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let cons = self.assignment()?;
        self.expect_punct(":")?;
        let alt = self.assignment()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(cons),
            Box::new(alt),
        ))
    }

    /// Binary operator at current position with its precedence and associativity
    fn peek_binop(&self) -> Option<(BinTok, u8, bool)> {
        let p = match self.peek() {
            Some(Token::Punct(p)) => *p,
            _ => return None,
        };
        let op = match p {
            "??" => (BinTok::Log(LogicalOp::Nullish), 1, false),
            "||" => (BinTok::Log(LogicalOp::Or), 2, false),
            "&&" => (BinTok::Log(LogicalOp::And), 3, false),
            "==" => (BinTok::Bin(BinaryOp::Eq), 4, false),
            "!=" => (BinTok::Bin(BinaryOp::NotEq), 4, false),
            "===" => (BinTok::Bin(BinaryOp::StrictEq), 4, false),
            "!==" => (BinTok::Bin(BinaryOp::StrictNotEq), 4, false),
            "<" => (BinTok::Bin(BinaryOp::Lt), 5, false),
            ">" => (BinTok::Bin(BinaryOp::Gt), 5, false),
            "<=" => (BinTok::Bin(BinaryOp::Le), 5, false),
            ">=" => (BinTok::Bin(BinaryOp::Ge), 5, false),
            "+" => (BinTok::Bin(BinaryOp::Add), 6, false),
            "-" => (BinTok::Bin(BinaryOp::Sub), 6, false),
            "*" => (BinTok::Bin(BinaryOp::Mul), 7, false),
            "/" => (BinTok::Bin(BinaryOp::Div), 7, false),
            "%" => (BinTok::Bin(BinaryOp::Rem), 7, false),
            "**" => (BinTok::Bin(BinaryOp::Pow), 8, true),
            _ => return None,
        };
        Some(op)
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.unary()?;
        let mut links = 0;
        while let Some((op, prec, right_assoc)) = self.peek_binop() {
            if prec < min_prec {
                break;
            }
            self.link(&mut links)?;
            self.pos += 1;
            let rhs = self.binary(if right_assoc { prec } else { prec + 1 })?;
            lhs = match op {
                BinTok::Bin(op) => Expr::Binary(op, Box::new(lhs), Box::new(rhs)),
                BinTok::Log(op) => Expr::Logical(op, Box::new(lhs), Box::new(rhs)),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        self.nested(Self::unary_body)
    }

    fn unary_body(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Punct("!")) => Some(UnaryOp::Not),
            Some(Token::Punct("-")) => Some(UnaryOp::Neg),
            Some(Token::Punct("+")) => Some(UnaryOp::Plus),
            Some(Token::Ident(w)) if w == "typeof" => Some(UnaryOp::Typeof),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            return Ok(Expr::Unary(op, Box::new(self.unary()?)));
        }

        let update = match self.peek() {
            Some(Token::Punct("++")) => Some(UpdateOp::Inc),
            Some(Token::Punct("--")) => Some(UpdateOp::Dec),
            _ => None,
        };
        if let Some(op) = update {
            self.pos += 1;
            let target = self.unary()?;
            return self.update(op, true, target);
        }

        let expr = self.call_member()?;
        let postfix = match self.peek() {
            Some(Token::Punct("++")) if !self.newline_before() => Some(UpdateOp::Inc),
            Some(Token::Punct("--")) if !self.newline_before() => Some(UpdateOp::Dec),
            _ => None,
        };
        match postfix {
            Some(op) => {
                self.pos += 1;
                self.update(op, false, expr)
            }
            None => Ok(expr),
        }
    }

    fn update(&self, op: UpdateOp, prefix: bool, target: Expr) -> Result<Expr> {
        if !matches!(target, Expr::Ident(_) | Expr::Member { optional: false, .. }) {
            return Err(self.err("Invalid left-hand side expression in update operation"));
        }
        Ok(Expr::Update {
            op,
            prefix,
            target: Box::new(target),
        })
    }

    fn call_member(&mut self) -> Result<Expr> {
        let mut expr = if self.is_word("new") {
            self.new_expr()?
        } else {
            self.primary()?
        };

        let mut links = 0;
        loop {
            if self.is_punct(".") || self.is_punct("?.") || self.is_punct("[") || self.is_punct("(") {
                self.link(&mut links)?;
            }
            if self.eat_punct(".") {
                let name = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    prop: MemberProp::Named(name),
                    optional: false,
                };
            } else if self.eat_punct("?.") {
                expr = if self.is_punct("(") {
                    Expr::Call {
                        callee: Box::new(expr),
                        args: self.arguments()?,
                        optional: true,
                    }
                } else if self.eat_punct("[") {
                    let prop = self.expression()?;
                    self.expect_punct("]")?;
                    Expr::Member {
                        object: Box::new(expr),
                        prop: MemberProp::Computed(Box::new(prop)),
                        optional: true,
                    }
                } else {
                    Expr::Member {
                        object: Box::new(expr),
                        prop: MemberProp::Named(self.property_name()?),
                        optional: true,
                    }
                };
            } else if self.eat_punct("[") {
                let prop = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    prop: MemberProp::Computed(Box::new(prop)),
                    optional: false,
                };
            } else if self.is_punct("(") {
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args: self.arguments()?,
                    optional: false,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn new_expr(&mut self) -> Result<Expr> {
        self.pos += 1; // new
        let mut callee = if self.is_word("new") {
            self.new_expr()?
        } else {
            self.primary()?
        };
        loop {
            if self.eat_punct(".") {
                callee = Expr::Member {
                    object: Box::new(callee),
                    prop: MemberProp::Named(self.property_name()?),
                    optional: false,
                };
            } else if self.eat_punct("[") {
                let prop = self.expression()?;
                self.expect_punct("]")?;
                callee = Expr::Member {
                    object: Box::new(callee),
                    prop: MemberProp::Computed(Box::new(prop)),
                    optional: false,
                };
            } else {
                break;
            }
        }
        let args = if self.is_punct("(") {
            self.arguments()?
        } else {
            vec![]
        };
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn arguments(&mut self) -> Result<Vec<Item>> {
        self.expect_punct("(")?;
        let mut args = vec![];
        while !self.eat_punct(")") {
            if self.eat_punct("...") {
                args.push(Item::Spread(self.assignment()?));
            } else {
                args.push(Item::Expr(self.assignment()?));
            }
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = match self.bump() {
            Some(t) => t,
            None => return Err(self.unexpected()),
        };
        match token {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Template(chunks) => {
                let parts = chunks
                    .into_iter()
                    .map(|c| match c {
                        Chunk::Str(s) => Ok(TemplatePart::Str(s)),
                        Chunk::Expr(src) => expr_at(&src, self.depth).map(TemplatePart::Expr),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::Template(parts))
            }
            Token::Ident(word) => match word.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "null" => Ok(Expr::Null),
                "undefined" => Ok(Expr::Undefined),
                "function" => {
                    let name = match self.peek() {
                        Some(Token::Ident(_)) => Some(self.identifier()?),
                        _ => None,
                    };
                    Ok(Expr::Function(Arc::new(self.function_rest(name)?)))
                }
                w if RESERVED.contains(&w) => {
                    self.pos -= 1;
                    Err(self.unexpected())
                }
                _ => Ok(Expr::Ident(word)),
            },
            Token::Punct("(") => {
                let e = self.expression()?;
                self.expect_punct(")")?;
                Ok(e)
            }
            Token::Punct("[") => {
                let mut items = vec![];
                while !self.eat_punct("]") {
                    if self.is_punct(",") {
                        self.pos += 1;
                        items.push(Item::Expr(Expr::Undefined));
                        continue;
                    }
                    if self.eat_punct("...") {
                        items.push(Item::Spread(self.assignment()?));
                    } else {
                        items.push(Item::Expr(self.assignment()?));
                    }
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Token::Punct("{") => self.object_literal(),
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    fn object_literal(&mut self) -> Result<Expr> {
        let mut props = vec![];
        while !self.eat_punct("}") {
            if self.eat_punct("...") {
                props.push(Prop::Spread(self.assignment()?));
            } else {
                let (key, shorthand) = match self.bump() {
                    Some(Token::Ident(k)) => (PropKey::Named(k.clone()), Some(k)),
                    Some(Token::Str(k)) => (PropKey::Named(k), None),
                    Some(Token::Num(n)) => (PropKey::Named(crate::types::fmt_num(n)), None),
                    Some(Token::Punct("[")) => {
                        let e = self.expression()?;
                        self.expect_punct("]")?;
                        (PropKey::Computed(e), None)
                    }
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    }
                };

                let value = if self.eat_punct(":") {
                    self.assignment()?
                } else if self.is_punct("(") {
                    let name = match &key {
                        PropKey::Named(n) => Some(n.clone()),
                        PropKey::Computed(_) => None,
                    };
                    Expr::Function(Arc::new(self.function_rest(name)?))
                } else {
                    match shorthand {
                        Some(name) if !RESERVED.contains(&name.as_str()) => Expr::Ident(name),
                        _ => return Err(self.unexpected()),
                    }
                };
                props.push(Prop::KeyValue(key, value));
            }
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(props))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn expr(text: &str) -> Expr {
        parse_expr(text).unwrap()
    }

    #[test]
    fn parse_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Num(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Num(2.0)),
                    Box::new(Expr::Num(3.0))
                ))
            )
        );
        assert_eq!(
            expr("2 ** 3 ** 2"),
            Expr::Binary(
                BinaryOp::Pow,
                Box::new(Expr::Num(2.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Pow,
                    Box::new(Expr::Num(3.0)),
                    Box::new(Expr::Num(2.0))
                ))
            )
        );
    }

    #[test]
    fn parse_arrow_functions() {
        assert_matches!(expr("d => d.letter"), Expr::Function(f) if f.params.len() == 1);
        assert_matches!(expr("(a, b) => a + b"), Expr::Function(f) if f.params.len() == 2);
        assert_matches!(expr("() => { return 1 }"), Expr::Function(f) if matches!(f.body, FuncBody::Block(_)));
        assert_matches!(expr("({x}) => x"), Expr::Function(f) if matches!(f.params[0].pattern, Pattern::Object(_)));
        assert_matches!(expr("(a) + 1"), Expr::Binary(BinaryOp::Add, _, _));
    }

    #[test]
    fn parse_member_chain() {
        assert_matches!(
            expr("d3.select('#output').append('svg').attr('width', 10)"),
            Expr::Call { .. }
        );
        assert_matches!(expr("a?.b"), Expr::Member { optional: true, .. });
        assert_matches!(expr("p.catch(e => e)"), Expr::Call { .. });
    }

    #[test]
    fn parse_new() {
        assert_matches!(expr("new Error('boom')"), Expr::New { args, .. } if args.len() == 1);
        assert_matches!(expr("new Date().getTime()"), Expr::Call { callee, .. } if matches!(*callee, Expr::Member { .. }));
    }

    #[test]
    fn parse_object_literal() {
        assert_eq!(
            expr("{top: 20, left, 'x-y': 1, range() { return 1 }}"),
            Expr::Object(vec![
                Prop::KeyValue(PropKey::Named("top".into()), Expr::Num(20.0)),
                Prop::KeyValue(PropKey::Named("left".into()), Expr::Ident("left".into())),
                Prop::KeyValue(PropKey::Named("x-y".into()), Expr::Num(1.0)),
                Prop::KeyValue(
                    PropKey::Named("range".into()),
                    Expr::Function(Arc::new(Function {
                        name: Some("range".into()),
                        params: vec![],
                        body: FuncBody::Block(vec![Stmt::Return(Some(Expr::Num(1.0)))]),
                    }))
                ),
            ])
        );
    }

    #[test]
    fn parse_statements() {
        let stmts = parse(
            r#"
            const data = sampleData.alphabet.slice(0, 10);
            let total = 0
            for (const d of data) { total += d.frequency }
            for (let i = 0; i < 3; i++) total++
            if (total > 1) { throw new Error('too much') } else return total
            "#,
        )
        .unwrap();
        assert_eq!(stmts.len(), 5);
        assert_matches!(stmts[2], Stmt::ForOf { .. });
        assert_matches!(stmts[3], Stmt::For { .. });
        assert_matches!(stmts[4], Stmt::If(_, _, Some(_)));
    }

    #[test]
    fn parse_return_newline() {
        let stmts = parse("return\n1").unwrap();
        assert_eq!(stmts, vec![Stmt::Return(None), Stmt::Expr(Expr::Num(1.0))]);
    }

    #[test]
    fn parse_destructuring() {
        let stmts = parse("const [lo, hi = 1] = extent; const {nodes, links: edges} = graph;").unwrap();
        assert_matches!(&stmts[0], Stmt::Decl(DeclKind::Const, d) if matches!(d[0].0, Pattern::Array(_)));
        assert_matches!(&stmts[1], Stmt::Decl(DeclKind::Const, d) if matches!(d[0].0, Pattern::Object(_)));
    }

    #[test]
    fn parse_template() {
        assert_eq!(
            expr("`a${1}b`"),
            Expr::Template(vec![
                TemplatePart::Str("a".into()),
                TemplatePart::Expr(Expr::Num(1.0)),
                TemplatePart::Str("b".into()),
            ])
        );
    }

    #[test]
    fn parse_errors() {
        assert_matches!(parse("const = 1"), Err(Error::Syntax(_)));
        assert_matches!(parse("let x = (1 + 2"), Err(Error::Syntax(_)));
        assert_matches!(parse("1 = 2"), Err(Error::Syntax(_)));
        assert_matches!(parse("a b"), Err(Error::Syntax(msg)) if msg == "Unexpected token b (line 1)");
        assert_matches!(parse("const x;"), Err(Error::Syntax(_)));
        assert_matches!(parse("{"), Err(Error::Syntax(msg)) if msg.contains("Unexpected end of input"));
    }

    #[test]
    fn parse_nesting_limit() {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(nesting_limits)
            .unwrap()
            .join()
            .unwrap();
    }

    fn nesting_limits() {
        let parens = format!("{}1{}", "(".repeat(3_000), ")".repeat(3_000));
        assert_matches!(parse_expr(&parens), Err(Error::Syntax(msg)) if msg.starts_with("Maximum nesting depth"));
        assert_matches!(parse(&"!".repeat(5_000)), Err(Error::Syntax(_)));
        assert_matches!(parse(&format!("{}{}", "{".repeat(1_000), "}".repeat(1_000))), Err(Error::Syntax(_)));
        assert_matches!(parse(&"a = ".repeat(1_000)), Err(Error::Syntax(_)));

        assert_matches!(parse_expr(&format!("{}1", "1 + ".repeat(5_000))), Err(Error::Syntax(msg)) if msg.contains("chain"));
        assert_matches!(parse_expr(&format!("a{}", ".b".repeat(5_000))), Err(Error::Syntax(_)));
        assert_matches!(parse_expr(&format!("f{}", "()".repeat(5_000))), Err(Error::Syntax(_)));
        assert!(parse_expr(&format!("{}1", "1 + ".repeat(500))).is_ok());

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse_expr(&shallow).unwrap(), Expr::Num(1.0));
    }

    #[test]
    fn parse_empty() {
        assert_eq!(parse("").unwrap(), vec![]);
        assert_eq!(parse(";;").unwrap(), vec![Stmt::Empty, Stmt::Empty]);
    }
}
