use core::fmt;
use std::mem::Discriminant;

use crate::queue::NodeQueue;

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LogAnd,
    LogOr,
    BitAnd,
    BitOr,
    BitXor,
    LeftShift,
    RightShift,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    NotEqual,
    EqualEqual,
    Assign,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOpKind {
    Increment,
    Decrement,
    Negate,
    LogNot,
    BitNot,
    Address,
    Dereference,
}

/// One tag, one matching payload; children are owned exclusively, so the
/// tree is a strict forest.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Expression {
        type_name: String,
        name: String,
        body: Option<Box<AstNode>>,
    },
    Scope {
        body: NodeQueue,
    },
    Return {
        expression: Box<AstNode>,
    },
    FunctionCall {
        name: String,
    },
    IntLiteral {
        value: i32,
    },
    CharLiteral {
        value: char,
    },
    FloatLiteral {
        value: f64,
    },
    StringLiteral {
        value: String,
    },
    BinaryOp {
        op: BinaryOpKind,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<AstNode>,
    },
    TernaryOp {
        condition: Box<AstNode>,
        true_branch: Box<AstNode>,
        false_branch: Box<AstNode>,
    },
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraversalOrder {
    PreOrder,
    PostOrder,
}

pub trait Visitor {
    fn traverse(&mut self, node: &AstNode) {
        let order = self.get_order();

        self.entry(node);

        if order == TraversalOrder::PreOrder {
            self.operate(node);
        }

        match node {
            AstNode::Expression { body, .. } => {
                if let Some(body) = body {
                    self.traverse(body);
                }
            }
            AstNode::Scope { body } => {
                for child in body.iter() {
                    self.traverse(child);
                }
            }
            AstNode::Return { expression } => {
                self.traverse(expression);
            }
            AstNode::BinaryOp { left, right, .. } => {
                self.traverse(left);
                self.traverse(right);
            }
            AstNode::UnaryOp { operand, .. } => {
                self.traverse(operand);
            }
            AstNode::TernaryOp { condition, true_branch, false_branch } => {
                self.traverse(condition);
                self.traverse(true_branch);
                self.traverse(false_branch);
            }
            // Terminal nodes
            AstNode::FunctionCall { .. }
            | AstNode::IntLiteral { .. }
            | AstNode::CharLiteral { .. }
            | AstNode::FloatLiteral { .. }
            | AstNode::StringLiteral { .. }
            | AstNode::Error => {}
        }

        if order == TraversalOrder::PostOrder {
            self.operate(node);
        }

        self.exit(node);
    }

    // Implementations should overload:
    fn operate(&mut self, _node: &AstNode) {}

    fn entry(&mut self, _node: &AstNode) {}

    fn exit(&mut self, _node: &AstNode) {}

    fn get_order(&self) -> TraversalOrder;
}

/// Collects node discriminants in traversal order.
pub struct AstCheck {
    pub results: Vec<Discriminant<AstNode>>,
}

impl AstCheck {
    pub fn new() -> AstCheck {
        AstCheck { results: Vec::new() }
    }
}

impl Default for AstCheck {
    fn default() -> Self {
        AstCheck::new()
    }
}

impl Visitor for AstCheck {
    fn get_order(&self) -> TraversalOrder {
        TraversalOrder::PreOrder
    }

    fn operate(&mut self, node: &AstNode) {
        self.results.push(std::mem::discriminant(node));
    }
}

/// Tree dump, one node per line, indented by depth.
pub struct AstPrint {
    pub debug_mode: bool,
    pub depth: usize,
}

impl AstPrint {
    pub fn new(debug_mode: bool) -> AstPrint {
        AstPrint { debug_mode, depth: 0 }
    }
}

impl Visitor for AstPrint {
    fn get_order(&self) -> TraversalOrder {
        TraversalOrder::PreOrder
    }

    fn operate(&mut self, node: &AstNode) {
        let whitespace_string: String =
            std::iter::repeat(' ').take((self.depth - 1) * 4).collect();
        if self.debug_mode {
            println!("{whitespace_string}{:?}", node)
        } else {
            println!("{whitespace_string}{}", node)
        }
    }

    fn entry(&mut self, _node: &AstNode) {
        self.depth += 1;
    }

    fn exit(&mut self, _node: &AstNode) {
        self.depth -= 1;
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Expression { type_name, name, .. } => {
                write!(f, "<Expression, {} {}>", type_name, name)
            }
            AstNode::Scope { .. } => write!(f, "<Scope>"),
            AstNode::Return { .. } => write!(f, "<Return>"),
            AstNode::FunctionCall { name } => write!(f, "<FunctionCall, {}>", name),
            AstNode::IntLiteral { value } => write!(f, "<IntLiteral, {}>", value),
            AstNode::CharLiteral { value } => write!(f, "<CharLiteral, '{}'>", value),
            AstNode::FloatLiteral { value } => write!(f, "<FloatLiteral, {}>", value),
            AstNode::StringLiteral { value } => write!(f, "<StringLiteral, \"{}\">", value),
            AstNode::BinaryOp { op, .. } => write!(f, "<BinaryOp, op: {:?}>", op),
            AstNode::UnaryOp { op, .. } => write!(f, "<UnaryOp, op: {:?}>", op),
            AstNode::TernaryOp { .. } => write!(f, "<TernaryOp>"),
            AstNode::Error => write!(f, "<Error>"),
        }
    }
}

#[cfg(test)]
mod ast_tests {
    use super::*;

    fn sample_tree() -> AstNode {
        let mut body = NodeQueue::new();
        body.push(AstNode::Expression {
            type_name: String::from("int"),
            name: String::from("x"),
            body: None,
        });
        body.push(AstNode::Return {
            expression: Box::new(AstNode::BinaryOp {
                op: BinaryOpKind::Add,
                left: Box::new(AstNode::IntLiteral { value: 1 }),
                right: Box::new(AstNode::IntLiteral { value: 2 }),
            }),
        });
        AstNode::Scope { body }
    }

    #[test]
    fn preorder_traversal_visits_every_node() {
        let tree = sample_tree();
        let mut check = AstCheck::new();
        check.traverse(&tree);

        let expected = vec![
            std::mem::discriminant(&tree),
            std::mem::discriminant(&AstNode::Expression {
                type_name: String::new(),
                name: String::new(),
                body: None,
            }),
            std::mem::discriminant(&AstNode::Return {
                expression: Box::new(AstNode::Error),
            }),
            std::mem::discriminant(&AstNode::BinaryOp {
                op: BinaryOpKind::Add,
                left: Box::new(AstNode::Error),
                right: Box::new(AstNode::Error),
            }),
            std::mem::discriminant(&AstNode::IntLiteral { value: 0 }),
            std::mem::discriminant(&AstNode::IntLiteral { value: 0 }),
        ];
        assert_eq!(check.results, expected);
    }

    #[test]
    fn postorder_puts_children_first() {
        struct Labels {
            seen: Vec<String>,
        }
        impl Visitor for Labels {
            fn get_order(&self) -> TraversalOrder {
                TraversalOrder::PostOrder
            }
            fn operate(&mut self, node: &AstNode) {
                self.seen.push(node.to_string());
            }
        }

        let tree = AstNode::Return {
            expression: Box::new(AstNode::IntLiteral { value: 7 }),
        };
        let mut labels = Labels { seen: Vec::new() };
        labels.traverse(&tree);
        assert_eq!(labels.seen, vec!["<IntLiteral, 7>", "<Return>"]);
    }

    #[test]
    fn display_labels() {
        assert_eq!(
            AstNode::Expression {
                type_name: String::from("float"),
                name: String::from("y"),
                body: None,
            }
            .to_string(),
            "<Expression, float y>"
        );
        assert_eq!(AstNode::FunctionCall { name: String::from("foo") }.to_string(), "<FunctionCall, foo>");
        assert_eq!(AstNode::Error.to_string(), "<Error>");
        assert_eq!(
            AstNode::TernaryOp {
                condition: Box::new(AstNode::IntLiteral { value: 1 }),
                true_branch: Box::new(AstNode::IntLiteral { value: 2 }),
                false_branch: Box::new(AstNode::IntLiteral { value: 3 }),
            }
            .to_string(),
            "<TernaryOp>"
        );
    }
}
