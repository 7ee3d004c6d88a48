//! Depth-first traversal of the syntax tree

use super::ast::Expr;

/// Visit every node in pre-order (parent before children, children in
/// source order). The callback receives the node and its ancestors,
/// root first. The first error stops the walk and is returned.
pub fn inspect<'a, E, F>(root: &'a Expr, mut visit: F) -> Result<(), E>
where
    F: FnMut(&'a Expr, &[&'a Expr]) -> Result<(), E>,
{
    let mut path = Vec::new();
    walk(root, &mut path, &mut visit)
}

fn walk<'a, E, F>(node: &'a Expr, path: &mut Vec<&'a Expr>, visit: &mut F) -> Result<(), E>
where
    F: FnMut(&'a Expr, &[&'a Expr]) -> Result<(), E>,
{
    visit(node, path.as_slice())?;

    path.push(node);
    for child in node.children() {
        walk(child, path, visit)?;
    }
    path.pop();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_pre_order_visit() {
        let expr = parse("sum(rate(foo[5m])) + bar").unwrap();
        let mut kinds = Vec::new();

        inspect::<(), _>(&expr, |node, path| {
            let kind = match node {
                Expr::Binary(_) => "binary",
                Expr::Aggregate(_) => "aggregate",
                Expr::Call(_) => "call",
                Expr::MatrixSelector(_) => "matrix",
                Expr::VectorSelector(_) => "vector",
                _ => "other",
            };
            kinds.push((kind, path.len()));
            Ok(())
        })
        .unwrap();

        assert_eq!(
            kinds,
            vec![
                ("binary", 0),
                ("aggregate", 1),
                ("call", 2),
                ("matrix", 3),
                ("vector", 1),
            ]
        );
    }

    #[test]
    fn test_error_stops_walk() {
        let expr = parse("a + b + c").unwrap();
        let mut visited = 0;

        let result = inspect(&expr, |node, _| {
            visited += 1;
            match node {
                Expr::VectorSelector(v) if v.name.as_deref() == Some("b") => Err("found b"),
                _ => Ok(()),
            }
        });

        assert_eq!(result, Err("found b"));
        // (a + b) + c: root, inner binary, a, b
        assert_eq!(visited, 4);
    }
}
