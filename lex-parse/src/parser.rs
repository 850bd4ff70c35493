use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::AstNode;
use crate::context::Context;
use crate::error::{ErrorHandler, SyntaxError};
use crate::queue::{NodeQueue, TokenQueue};
use crate::token::{Token, TokenKind};

/// Recursive-descent parser over a pre-lexed token queue. Matched tokens
/// move from `pending` into `consumed`, so the pair always holds the full
/// token record of the input.
pub struct Parser<'a> {
    pending: TokenQueue,
    consumed: TokenQueue,
    context: &'a Context,
    handler: Rc<RefCell<ErrorHandler>>,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: TokenQueue,
        context: &'a Context,
        handler: Rc<RefCell<ErrorHandler>>,
    ) -> Parser<'a> {
        Parser {
            pending: tokens,
            consumed: TokenQueue::new(),
            context,
            handler,
        }
    }

    pub fn pending(&self) -> &TokenQueue {
        &self.pending
    }

    /// Tokens already matched, in match order.
    pub fn consumed(&self) -> &TokenQueue {
        &self.consumed
    }

    /// Top-level entry. Recoverable statement errors are reported and
    /// turned into `Error` nodes inside the scope; `None` means the scope
    /// structure itself could not be parsed.
    pub fn parse(&mut self) -> Option<AstNode> {
        match self.parse_scope() {
            Ok(node) => Some(node),
            Err(error) => {
                self.handler.borrow_mut().report_syntax_error(&error);
                None
            }
        }
    }

    /// `{ statement* }`. Dispatches on the pending head: `return`,
    /// declarations, function calls, and bare integer values.
    pub fn parse_scope(&mut self) -> Result<AstNode, SyntaxError> {
        if self.pending.len() < 2 {
            return Err(SyntaxError::InsufficientTokens { production: "scope" });
        }

        let open = self.expect(TokenKind::OpenBrace, "scope")?;
        let mut body = NodeQueue::new();

        while !self.pending.is_empty() && !self.check(TokenKind::CloseBrace) {
            let statement = match self.peek_kind() {
                TokenKind::Return => self.parse_return(),
                kind if kind.is_data_type() => self.parse_expression(),
                TokenKind::Identifier => self.parse_function_call(),
                TokenKind::IntLiteral => self.parse_value().and_then(|value| {
                    self.expect(TokenKind::Semicolon, "value statement")?;
                    Ok(value)
                }),
                _ => {
                    let found = self.pending.peek().copied().unwrap_or_default();
                    Err(SyntaxError::GeneralError {
                        message: format!(
                            "unexpected token '{}' in scope",
                            found.spelling(self.context)
                        ),
                        row: found.row,
                        col: found.col,
                    })
                }
            };

            match statement {
                Ok(node) => body.push(node),
                Err(error) => {
                    self.handler.borrow_mut().report_syntax_error(&error);
                    self.synchronize();
                    body.push(AstNode::Error);
                }
            }
        }

        // Exhaustion without a closing brace is an error, not a silent stop.
        match self.expect(TokenKind::CloseBrace, "scope") {
            Ok(_) => Ok(AstNode::Scope { body }),
            Err(_) => Err(SyntaxError::UnclosedScope { row: open.row, col: open.col }),
        }
    }

    /// Declaration form: data-type keyword, identifier, `;`.
    pub fn parse_expression(&mut self) -> Result<AstNode, SyntaxError> {
        if self.pending.len() < 3 {
            return Err(SyntaxError::InsufficientTokens { production: "declaration" });
        }

        let type_token = match self.pending.peek().copied() {
            Some(token) if token.kind.is_data_type() => token,
            Some(token) => {
                return Err(SyntaxError::GeneralError {
                    message: format!(
                        "unexpected token '{}', a data type was expected",
                        token.spelling(self.context)
                    ),
                    row: token.row,
                    col: token.col,
                })
            }
            None => return Err(SyntaxError::InsufficientTokens { production: "declaration" }),
        };
        self.take();

        let name_token = self.expect(TokenKind::Identifier, "declaration")?;
        self.expect(TokenKind::Semicolon, "declaration")?;

        Ok(AstNode::Expression {
            type_name: type_token.spelling(self.context),
            name: name_token.spelling(self.context),
            body: None,
        })
    }

    /// `return <value> ;`
    pub fn parse_return(&mut self) -> Result<AstNode, SyntaxError> {
        if self.pending.len() < 3 {
            return Err(SyntaxError::InsufficientTokens { production: "return statement" });
        }

        self.expect(TokenKind::Return, "return statement")?;
        let value = self.parse_value()?;
        self.expect(TokenKind::Semicolon, "return statement")?;

        Ok(AstNode::Return { expression: Box::new(value) })
    }

    /// A single integer literal.
    pub fn parse_value(&mut self) -> Result<AstNode, SyntaxError> {
        if self.pending.is_empty() {
            return Err(SyntaxError::InsufficientTokens { production: "value" });
        }

        let token = self.expect(TokenKind::IntLiteral, "value")?;
        Ok(AstNode::IntLiteral { value: int_value(&token.spelling(self.context)) })
    }

    /// Call form: identifier, `(`, `)`, `;`.
    pub fn parse_function_call(&mut self) -> Result<AstNode, SyntaxError> {
        if self.pending.len() < 4 {
            return Err(SyntaxError::InsufficientTokens { production: "function call" });
        }

        let name_token = self.expect(TokenKind::Identifier, "function call")?;
        self.expect(TokenKind::OpenParen, "function call")?;
        self.expect(TokenKind::CloseParen, "function call")?;
        self.expect(TokenKind::Semicolon, "function call")?;

        Ok(AstNode::FunctionCall { name: name_token.spelling(self.context) })
    }

    fn peek_kind(&self) -> TokenKind {
        self.pending.peek().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Move the pending head into the consumed record.
    fn take(&mut self) -> Option<Token> {
        let token = self.pending.pop()?;
        self.consumed.push(token);
        Some(token)
    }

    fn expect(&mut self, kind: TokenKind, production: &'static str) -> Result<Token, SyntaxError> {
        match self.pending.peek().copied() {
            Some(token) if token.kind == kind => {
                self.take();
                Ok(token)
            }
            Some(token) => Err(SyntaxError::UnexpectedToken {
                expected: kind,
                found: token.kind,
                text: token.spelling(self.context),
                row: token.row,
                col: token.col,
            }),
            None => Err(SyntaxError::InsufficientTokens { production }),
        }
    }

    /// Panic-mode recovery: drop tokens through the next `;`, stopping
    /// before a `}` or the end of input, then re-arm reporting.
    fn synchronize(&mut self) {
        while let Some(&token) = self.pending.peek() {
            if token.kind == TokenKind::CloseBrace {
                break;
            }
            self.take();
            if token.kind == TokenKind::Semicolon {
                break;
            }
        }
        self.handler.borrow_mut().exit_panic();
    }
}

/// Integer text to value, honoring the hex and binary prefixes the lexer
/// accepts. Unconvertible text falls back to zero.
fn int_value(text: &str) -> i32 {
    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i32::from_str_radix(digits, 16).unwrap_or_default()
    } else if let Some(digits) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        i32::from_str_radix(digits, 2).unwrap_or_default()
    } else {
        text.parse().unwrap_or_default()
    }
}

#[cfg(test)]
mod parser_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ast::{AstCheck, Visitor};
    use crate::lexer::Lexer;
    use crate::token::TokenKind::*;

    fn setup(source: &str) -> (Context, Rc<RefCell<ErrorHandler>>, TokenQueue) {
        let context = Context::new();
        let handler = Rc::new(RefCell::new(ErrorHandler::new(source)));
        let queue = {
            let mut lexer = Lexer::new(source, &context, handler.clone());
            lexer.tokenize()
        };
        (context, handler, queue)
    }

    #[test]
    fn scope_with_return() {
        let (context, handler, tokens) = setup("{ return 0; }");
        let mut parser = Parser::new(tokens, &context, handler.clone());

        let ast = parser.parse().expect("scope should parse");
        match &ast {
            AstNode::Scope { body } => {
                assert_eq!(body.len(), 1);
                match body.peek() {
                    Some(AstNode::Return { expression }) => {
                        assert_eq!(**expression, AstNode::IntLiteral { value: 0 });
                    }
                    other => panic!("expected a return statement, got {:?}", other),
                }
            }
            other => panic!("expected a scope, got {:?}", other),
        }

        assert!(parser.pending().is_empty());
        let consumed: Vec<TokenKind> = parser.consumed().iter().map(|t| t.kind).collect();
        assert_eq!(consumed, vec![OpenBrace, Return, IntLiteral, Semicolon, CloseBrace]);
        assert!(!handler.borrow().had_error);
    }

    #[test]
    fn declaration_builds_expression_node() {
        let (context, handler, tokens) = setup("{ int x; }");
        let mut parser = Parser::new(tokens, &context, handler.clone());

        let ast = parser.parse().expect("scope should parse");
        match &ast {
            AstNode::Scope { body } => {
                assert_eq!(
                    body.peek(),
                    Some(&AstNode::Expression {
                        type_name: String::from("int"),
                        name: String::from("x"),
                        body: None,
                    })
                );
            }
            other => panic!("expected a scope, got {:?}", other),
        }
        assert!(!handler.borrow().had_error);
    }

    #[test]
    fn function_call_statement() {
        let (context, handler, tokens) = setup("{ foo(); }");
        let mut parser = Parser::new(tokens, &context, handler);

        let ast = parser.parse().expect("scope should parse");
        match &ast {
            AstNode::Scope { body } => {
                assert_eq!(body.peek(), Some(&AstNode::FunctionCall { name: String::from("foo") }));
            }
            other => panic!("expected a scope, got {:?}", other),
        }
    }

    #[test]
    fn bare_value_statement() {
        let (context, handler, tokens) = setup("{ 42; }");
        let mut parser = Parser::new(tokens, &context, handler);

        let ast = parser.parse().expect("scope should parse");
        match &ast {
            AstNode::Scope { body } => {
                assert_eq!(body.peek(), Some(&AstNode::IntLiteral { value: 42 }));
            }
            other => panic!("expected a scope, got {:?}", other),
        }
    }

    #[test]
    fn hex_and_binary_values_convert() {
        let (context, handler, tokens) = setup("{ return 0x1A; }");
        let mut parser = Parser::new(tokens, &context, handler);
        let ast = parser.parse().expect("scope should parse");
        match &ast {
            AstNode::Scope { body } => match body.peek() {
                Some(AstNode::Return { expression }) => {
                    assert_eq!(**expression, AstNode::IntLiteral { value: 26 });
                }
                other => panic!("expected a return statement, got {:?}", other),
            },
            other => panic!("expected a scope, got {:?}", other),
        }

        assert_eq!(int_value("0b1010"), 10);
        assert_eq!(int_value("0"), 0);
    }

    #[test]
    fn syntax_error_recovers_at_semicolon() {
        let (context, handler, tokens) = setup("{ int 5; return 0; }");
        let mut parser = Parser::new(tokens, &context, handler.clone());

        let ast = parser.parse().expect("scope should survive a bad statement");
        match &ast {
            AstNode::Scope { body } => {
                let children: Vec<&AstNode> = body.iter().collect();
                assert_eq!(children.len(), 2);
                assert_eq!(children[0], &AstNode::Error);
                assert!(matches!(children[1], AstNode::Return { .. }));
            }
            other => panic!("expected a scope, got {:?}", other),
        }

        assert!(handler.borrow().had_error);
        // Recovery re-armed reporting before the second statement parsed.
        assert!(!handler.borrow().panic_mode);
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn unknown_statement_token_is_recovered() {
        let (context, handler, tokens) = setup("{ + ; int x; }");
        let mut parser = Parser::new(tokens, &context, handler.clone());

        let ast = parser.parse().expect("scope should survive");
        match &ast {
            AstNode::Scope { body } => {
                let children: Vec<&AstNode> = body.iter().collect();
                assert_eq!(children.len(), 2);
                assert_eq!(children[0], &AstNode::Error);
                assert!(matches!(children[1], AstNode::Expression { .. }));
            }
            other => panic!("expected a scope, got {:?}", other),
        }
        assert!(handler.borrow().had_error);
    }

    #[test]
    fn unclosed_scope_is_an_error() {
        let (context, handler, tokens) = setup("{ return 0;");
        let mut parser = Parser::new(tokens, &context, handler.clone());

        assert_eq!(
            parser.parse_scope(),
            Err(SyntaxError::UnclosedScope { row: 1, col: 1 })
        );
    }

    #[test]
    fn missing_open_brace_reports() {
        let (context, handler, tokens) = setup("return 0; }");
        let mut parser = Parser::new(tokens, &context, handler.clone());

        assert!(parser.parse().is_none());
        assert!(handler.borrow().had_error);
    }

    #[test]
    fn too_few_tokens_for_a_scope() {
        let (context, handler, tokens) = setup("{");
        let mut parser = Parser::new(tokens, &context, handler.clone());

        assert_eq!(
            parser.parse_scope(),
            Err(SyntaxError::InsufficientTokens { production: "scope" })
        );
        assert!(parser.parse().is_none());
        assert!(handler.borrow().had_error);
    }

    #[test]
    fn consumed_queue_records_every_matched_token() {
        let (context, handler, tokens) = setup("{ int x; foo(); }");
        let total = tokens.len();
        let mut parser = Parser::new(tokens, &context, handler);

        parser.parse().expect("scope should parse");
        assert!(parser.pending().is_empty());
        assert_eq!(parser.consumed().len(), total);
    }

    #[test]
    fn parsed_tree_traverses_cleanly() {
        let (context, handler, tokens) = setup("{ int x; return 3; }");
        let mut parser = Parser::new(tokens, &context, handler);

        let ast = parser.parse().expect("scope should parse");
        let mut check = AstCheck::new();
        check.traverse(&ast);
        // Scope, Expression, Return, IntLiteral.
        assert_eq!(check.results.len(), 4);
    }
}
