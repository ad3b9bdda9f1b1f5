// ABOUTME: Pratt-style expression parser: primaries, prefix/infix/postfix
// ABOUTME: operators, ternary, calls, subscripts, and the `lambda` form.

use super::Parser;
use crate::ast::Expr;
use crate::error::ParseError;
use crate::token::TokenKind;
use std::rc::Rc;

/// Binding-power table, §4.2. Higher binds tighter; left == right+1 is
/// left-associative, left == right-1 is right-associative.
fn infix_bp(kind: TokenKind) -> Option<(u8, u8)> {
    use TokenKind::*;
    Some(match kind {
        Eq => (6, 0),
        Question => (2, 1),
        OrOr => (3, 4),
        AndAnd => (5, 6),
        Pipe => (6, 7),
        Caret => (7, 8),
        Amp => (8, 9),
        RegexMatch => (7, 8),
        EqEq | NotEq => (9, 10),
        Lt | Le | Gt | Ge => (11, 12),
        Shl | Shr | UShr => (12, 13),
        Plus | Minus => (13, 14),
        Percent => (15, 16),
        Star | Slash => (17, 18),
        StarStar => (18, 17),
        Dot => (19, 20),
        _ => return None,
    })
}

const PREFIX_BP: u8 = 19;
const POSTFIX_BP: u8 = 19;

fn is_prefix(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Minus | TokenKind::Bang | TokenKind::Tilde)
}

fn is_postfix_opener(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::LParen | TokenKind::LBracket)
}

pub(super) fn parse_expr(p: &mut Parser, min_bp: u8) -> Result<Expr, ParseError> {
    let mut lhs = parse_primary(p)?;

    loop {
        let kind = p.peek_kind();

        if is_postfix_opener(kind) {
            if POSTFIX_BP < min_bp {
                break;
            }
            lhs = parse_postfix(p, lhs)?;
            continue;
        }

        if kind == TokenKind::Question {
            let (left_bp, right_bp) = infix_bp(kind).expect("Question has a binding power");
            if left_bp < min_bp {
                break;
            }
            let op = p.advance();
            let consequent = parse_expr(p, 0)?;
            p.expect(TokenKind::Colon, "':' in ternary expression")?;
            let alternate = parse_expr(p, right_bp)?;
            lhs = Expr::Ternary(op, Box::new(lhs), Box::new(consequent), Box::new(alternate));
            continue;
        }

        match infix_bp(kind) {
            Some((left_bp, right_bp)) if left_bp >= min_bp => {
                let op = p.advance();
                let rhs = parse_expr(p, right_bp)?;
                lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
            }
            _ => break,
        }
    }

    Ok(lhs)
}

fn parse_postfix(p: &mut Parser, lhs: Expr) -> Result<Expr, ParseError> {
    match p.peek_kind() {
        TokenKind::LParen => {
            p.advance();
            let args = parse_args(p)?;
            let close = p.expect(TokenKind::RParen, "')'")?;
            Ok(Expr::Call(Box::new(lhs), args, close))
        }
        TokenKind::LBracket => {
            let open = p.advance();
            let index = parse_expr(p, 0)?;
            p.expect(TokenKind::RBracket, "']'")?;
            Ok(Expr::Subscript(open, Box::new(lhs), Box::new(index)))
        }
        _ => unreachable!("caller only dispatches on postfix openers"),
    }
}

fn parse_args(p: &mut Parser) -> Result<Vec<Expr>, ParseError> {
    let mut args = Vec::new();
    if p.check(TokenKind::RParen) {
        return Ok(args);
    }
    loop {
        args.push(parse_expr(p, 0)?);
        if p.check(TokenKind::Comma) {
            p.advance();
            if p.check(TokenKind::RParen) {
                return Err(ParseError::TrailingComma {
                    line: p.current().line,
                });
            }
            continue;
        }
        break;
    }
    Ok(args)
}

fn parse_primary(p: &mut Parser) -> Result<Expr, ParseError> {
    let kind = p.peek_kind();

    if is_prefix(kind) {
        let op = p.advance();
        let operand = parse_expr(p, PREFIX_BP)?;
        return Ok(Expr::Unary(op, Box::new(operand)));
    }

    match kind {
        TokenKind::LParen => {
            p.advance();
            let inner = parse_expr(p, 0)?;
            p.expect(TokenKind::RParen, "')'")?;
            Ok(inner)
        }
        TokenKind::Number
        | TokenKind::Str
        | TokenKind::Regex
        | TokenKind::Ident
        | TokenKind::True
        | TokenKind::False
        | TokenKind::Nil => Ok(Expr::Leaf(p.advance())),
        TokenKind::KwLambda => parse_lambda(p),
        _ => Err(ParseError::unexpected("an expression", p.current())),
    }
}

fn parse_lambda(p: &mut Parser) -> Result<Expr, ParseError> {
    let kw = p.advance(); // `lambda`
    p.expect(TokenKind::LParen, "'(' after 'lambda'")?;
    let mut params = Vec::new();
    if !p.check(TokenKind::RParen) {
        loop {
            let name = p.expect(TokenKind::Ident, "a parameter name")?;
            params.push(Rc::from(name.lexeme.as_ref()));
            if p.check(TokenKind::Comma) {
                p.advance();
                if p.check(TokenKind::RParen) {
                    return Err(ParseError::TrailingComma {
                        line: p.current().line,
                    });
                }
                continue;
            }
            break;
        }
    }
    p.expect(TokenKind::RParen, "')'")?;
    p.expect(TokenKind::Arrow, "'->'")?;
    let body = parse_expr(p, 0)?;
    p.expect(TokenKind::KwEnd, "'end'")?;
    Ok(Expr::Lambda(params, Box::new(body), kw))
}

#[cfg(test)]
mod tests {
    use super::super::parse_expr_str;
    use crate::ast::Expr;
    use crate::token::TokenKind;

    fn binop(e: &Expr) -> TokenKind {
        match e {
            Expr::Binary(tok, ..) => tok.kind,
            _ => panic!("not a binary node: {e:?}"),
        }
    }

    #[test]
    fn precedence_groups_tighter_operator_first() {
        // `+` (13/14) binds tighter than `==` (9/10): 1 + 2 == 3 parses as
        // (1 + 2) == 3.
        let e = parse_expr_str("1 + 2 == 3").unwrap();
        assert_eq!(binop(&e), TokenKind::EqEq);
        match e {
            Expr::Binary(_, lhs, _) => assert_eq!(binop(&lhs), TokenKind::Plus),
            _ => unreachable!(),
        }
    }

    #[test]
    fn star_star_is_right_associative() {
        // 2 ** 3 ** 2 == 2 ** (3 ** 2)
        let e = parse_expr_str("2 ** 3 ** 2").unwrap();
        match e {
            Expr::Binary(tok, _, rhs) => {
                assert_eq!(tok.kind, TokenKind::StarStar);
                assert_eq!(binop(&rhs), TokenKind::StarStar);
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn plus_minus_are_left_associative() {
        // 1 - 2 - 3 == (1 - 2) - 3
        let e = parse_expr_str("1 - 2 - 3").unwrap();
        match e {
            Expr::Binary(tok, lhs, _) => {
                assert_eq!(tok.kind, TokenKind::Minus);
                assert_eq!(binop(&lhs), TokenKind::Minus);
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        // a = b = c == a = (b = c)
        let e = parse_expr_str("a = b = c").unwrap();
        match e {
            Expr::Binary(tok, _, rhs) => {
                assert_eq!(tok.kind, TokenKind::Eq);
                assert_eq!(binop(&rhs), TokenKind::Eq);
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn call_and_subscript_chain() {
        let e = parse_expr_str("f(1, 2)[0]").unwrap();
        assert!(matches!(e, Expr::Subscript(..)));
    }

    #[test]
    fn dot_chain_is_nested_binary() {
        let e = parse_expr_str("a.b.c").unwrap();
        assert_eq!(binop(&e), TokenKind::Dot);
    }

    #[test]
    fn ternary_nests_right() {
        let e = parse_expr_str("a ? b : c ? d : e").unwrap();
        match e {
            Expr::Ternary(_, _, _, alt) => assert!(matches!(*alt, Expr::Ternary(..))),
            _ => panic!("expected ternary"),
        }
    }

    #[test]
    fn lambda_with_params() {
        let e = parse_expr_str("lambda(x, y) -> x + y end").unwrap();
        match e {
            Expr::Lambda(params, _, _) => assert_eq!(params.len(), 2),
            _ => panic!("expected lambda"),
        }
    }

    #[test]
    fn trailing_comma_in_call_is_rejected() {
        assert!(parse_expr_str("f(1, 2,)").is_err());
    }
}
