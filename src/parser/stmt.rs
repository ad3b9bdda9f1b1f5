// ABOUTME: Statement-level script parser (§4.3): skips leading semicolons at
// ABOUTME: each dispatch point and delegates every embedded expression to the Pratt core.

use super::Parser;
use crate::ast::{ElsifClause, Expr, Stmt};
use crate::error::ParseError;
use crate::token::TokenKind;
use std::rc::Rc;

pub(super) fn parse_stmt_list_until(
    p: &mut Parser,
    end: TokenKind,
) -> Result<Vec<Stmt>, ParseError> {
    let mut stmts = Vec::new();
    loop {
        skip_semicolons(p);
        if p.check(end) || p.check(TokenKind::Eof) {
            break;
        }
        stmts.push(parse_stmt(p)?);
    }
    Ok(stmts)
}

fn skip_semicolons(p: &mut Parser) {
    while p.check(TokenKind::Semicolon) {
        p.advance();
    }
}

fn maybe_semicolon(p: &mut Parser) -> bool {
    if p.check(TokenKind::Semicolon) {
        p.advance();
        true
    } else {
        false
    }
}

fn parse_block(p: &mut Parser) -> Result<Vec<Stmt>, ParseError> {
    p.expect(TokenKind::LBrace, "'{'")?;
    let stmts = parse_stmt_list_until(p, TokenKind::RBrace)?;
    p.expect(TokenKind::RBrace, "'}'")?;
    Ok(stmts)
}

fn parse_stmt(p: &mut Parser) -> Result<Stmt, ParseError> {
    match p.peek_kind() {
        TokenKind::KwLet => parse_let(p),
        TokenKind::KwIf => parse_if(p),
        TokenKind::KwWhile => parse_while(p),
        TokenKind::KwFor => parse_for(p),
        TokenKind::KwFn => parse_fn(p),
        TokenKind::KwTry => parse_try(p),
        TokenKind::KwThrow => parse_throw(p),
        TokenKind::KwReturn => parse_return(p),
        TokenKind::KwBreak => {
            let tok = p.advance();
            maybe_semicolon(p);
            Ok(Stmt::Break { line: tok.line })
        }
        TokenKind::KwContinue => {
            let tok = p.advance();
            maybe_semicolon(p);
            Ok(Stmt::Continue { line: tok.line })
        }
        TokenKind::LBrace => Ok(Stmt::Block(parse_block(p)?)),
        _ => parse_expr_stmt(p),
    }
}

fn parse_let(p: &mut Parser) -> Result<Stmt, ParseError> {
    let kw = p.advance(); // `let`
    let name_tok = p.expect(TokenKind::Ident, "a variable name")?;
    p.expect(TokenKind::Eq, "'=' in let binding")?;
    let init = p.parse_expression(0)?;
    maybe_semicolon(p);
    Ok(Stmt::Let {
        name: Rc::from(name_tok.lexeme.as_ref()),
        init,
        line: kw.line,
    })
}

/// `if`/`while`/`elsif` all accept an optionally-parenthesized condition.
fn parse_optional_parens_cond(p: &mut Parser) -> Result<Expr, ParseError> {
    if p.check(TokenKind::LParen) {
        p.advance();
        let cond = p.parse_expression(0)?;
        p.expect(TokenKind::RParen, "')'")?;
        Ok(cond)
    } else {
        p.parse_expression(0)
    }
}

fn parse_if(p: &mut Parser) -> Result<Stmt, ParseError> {
    p.advance(); // `if`
    let cond = parse_optional_parens_cond(p)?;
    let then_branch = parse_block(p)?;

    let mut elsifs = Vec::new();
    let mut else_branch = None;

    loop {
        if p.check(TokenKind::KwElsif) {
            p.advance();
            let elsif_cond = parse_optional_parens_cond(p)?;
            let body = parse_block(p)?;
            elsifs.push(ElsifClause {
                cond: elsif_cond,
                body,
            });
            continue;
        }
        if p.check(TokenKind::KwElse) {
            p.advance();
            else_branch = Some(parse_block(p)?);
        }
        break;
    }

    Ok(Stmt::If {
        cond,
        then_branch,
        elsifs,
        else_branch,
    })
}

fn parse_while(p: &mut Parser) -> Result<Stmt, ParseError> {
    p.advance(); // `while`
    let cond = parse_optional_parens_cond(p)?;
    let body = parse_block(p)?;
    Ok(Stmt::While { cond, body })
}

fn parse_for(p: &mut Parser) -> Result<Stmt, ParseError> {
    p.advance(); // `for`
    let first = p.expect(TokenKind::Ident, "a loop variable name")?;
    let (index_name, item_name) = if p.check(TokenKind::Comma) {
        p.advance();
        let second = p.expect(TokenKind::Ident, "a loop item name")?;
        (
            Some(Rc::from(first.lexeme.as_ref())),
            Rc::from(second.lexeme.as_ref()),
        )
    } else {
        (None, Rc::from(first.lexeme.as_ref()))
    };
    p.expect(TokenKind::KwIn, "'in'")?;
    let iterable = p.parse_expression(0)?;
    let body = parse_block(p)?;
    Ok(Stmt::For {
        index_name,
        item_name,
        iterable,
        body,
    })
}

fn parse_params(p: &mut Parser) -> Result<Vec<Rc<str>>, ParseError> {
    p.expect(TokenKind::LParen, "'('")?;
    let mut params = Vec::new();
    if !p.check(TokenKind::RParen) {
        loop {
            let name = p.expect(TokenKind::Ident, "a parameter name")?;
            params.push(Rc::from(name.lexeme.as_ref()));
            if p.check(TokenKind::Comma) {
                p.advance();
                if p.check(TokenKind::RParen) {
                    return Err(ParseError::TrailingComma {
                        line: p.current_line(),
                    });
                }
                continue;
            }
            break;
        }
    }
    p.expect(TokenKind::RParen, "')'")?;
    Ok(params)
}

fn parse_fn(p: &mut Parser) -> Result<Stmt, ParseError> {
    let kw = p.advance(); // `fn`
    let name_tok = p.expect(TokenKind::Ident, "a function name")?;
    let params = parse_params(p)?;
    let body = parse_block(p)?;
    Ok(Stmt::Fn {
        name: Rc::from(name_tok.lexeme.as_ref()),
        params,
        body,
        line: kw.line,
    })
}

fn parse_try(p: &mut Parser) -> Result<Stmt, ParseError> {
    p.advance(); // `try`
    let try_block = parse_block(p)?;

    let mut catch_name = None;
    let mut catch_block = None;
    if p.check(TokenKind::KwCatch) {
        p.advance();
        p.expect(TokenKind::LParen, "'(' after 'catch'")?;
        let name = p.expect(TokenKind::Ident, "a catch variable name")?;
        catch_name = Some(Rc::from(name.lexeme.as_ref()));
        p.expect(TokenKind::RParen, "')'")?;
        catch_block = Some(parse_block(p)?);
    }

    let finally_block = if p.check(TokenKind::KwFinally) {
        p.advance();
        Some(parse_block(p)?)
    } else {
        None
    };

    Ok(Stmt::Try {
        try_block,
        catch_name,
        catch_block,
        finally_block,
    })
}

fn parse_throw(p: &mut Parser) -> Result<Stmt, ParseError> {
    let kw = p.advance(); // `throw`
    let expr = p.parse_expression(0)?;
    maybe_semicolon(p);
    Ok(Stmt::Throw { expr, line: kw.line })
}

fn parse_return(p: &mut Parser) -> Result<Stmt, ParseError> {
    let kw = p.advance(); // `return`
    let expr = if matches!(
        p.peek_kind(),
        TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof
    ) {
        None
    } else {
        Some(p.parse_expression(0)?)
    };
    maybe_semicolon(p);
    Ok(Stmt::Return {
        expr,
        line: kw.line,
    })
}

fn parse_expr_stmt(p: &mut Parser) -> Result<Stmt, ParseError> {
    let expr = p.parse_expression(0)?;
    let had_semicolon = maybe_semicolon(p);
    Ok(Stmt::ExprStmt { expr, had_semicolon })
}

#[cfg(test)]
mod tests {
    use super::super::parse_script;
    use crate::ast::Stmt;

    #[test]
    fn if_elsif_else_chain() {
        let stmts = parse_script("if (a) { 1 } elsif (b) { 2 } else { 3 }").unwrap();
        match &stmts[0] {
            Stmt::If {
                elsifs,
                else_branch,
                ..
            } => {
                assert_eq!(elsifs.len(), 1);
                assert!(else_branch.is_some());
            }
            _ => panic!("expected if"),
        }
    }

    #[test]
    fn for_with_index_and_item() {
        let stmts = parse_script("for i, x in xs { x }").unwrap();
        match &stmts[0] {
            Stmt::For {
                index_name,
                item_name,
                ..
            } => {
                assert_eq!(index_name.as_deref(), Some("i"));
                assert_eq!(&**item_name, "x");
            }
            _ => panic!("expected for"),
        }
    }

    #[test]
    fn semicolon_is_recorded_on_expr_stmt() {
        let stmts = parse_script("1;").unwrap();
        match &stmts[0] {
            Stmt::ExprStmt { had_semicolon, .. } => assert!(*had_semicolon),
            _ => panic!("expected expr stmt"),
        }
        let stmts = parse_script("1").unwrap();
        match &stmts[0] {
            Stmt::ExprStmt { had_semicolon, .. } => assert!(!*had_semicolon),
            _ => panic!("expected expr stmt"),
        }
    }

    #[test]
    fn try_catch_finally() {
        let stmts = parse_script("try { 1 } catch (e) { 2 } finally { 3 }").unwrap();
        match &stmts[0] {
            Stmt::Try {
                catch_name,
                finally_block,
                ..
            } => {
                assert_eq!(catch_name.as_deref(), Some("e"));
                assert!(finally_block.is_some());
            }
            _ => panic!("expected try"),
        }
    }

    #[test]
    fn return_with_no_expression() {
        let stmts = parse_script("fn f() { return; }").unwrap();
        match &stmts[0] {
            Stmt::Fn { body, .. } => match &body[0] {
                Stmt::Return { expr, .. } => assert!(expr.is_none()),
                _ => panic!("expected return"),
            },
            _ => panic!("expected fn"),
        }
    }
}
