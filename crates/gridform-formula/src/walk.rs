//! Tree traversal
//!
//! Children are visited in source order: binary left then right, a callee
//! before its arguments, group elements and call arguments in order.

use std::borrow::Cow;

use crate::ast::{Binary, Call, Dimensioned, Group, ImplicitCall, Unary, Unit, UnitKind};

/// Pre-order visit of every unit; returning `false` skips that unit's children
///
/// ```rust
/// use gridform_formula::{parse_formula, walk, UnitKind};
///
/// let root = parse_formula("=SUM(A1, B2) + C3").root.unwrap();
/// let mut addresses = 0;
/// walk(&root, |unit| {
///     if matches!(unit.kind, UnitKind::Address(_)) {
///         addresses += 1;
///     }
///     true
/// });
/// assert_eq!(addresses, 3);
/// ```
pub fn walk<'a, F>(unit: &'a Unit, mut visitor: F)
where
    F: FnMut(&'a Unit) -> bool,
{
    walk_with(unit, &mut visitor);
}

fn walk_with<'a, F>(unit: &'a Unit, visitor: &mut F)
where
    F: FnMut(&'a Unit) -> bool,
{
    if !visitor(unit) {
        return;
    }
    match &unit.kind {
        UnitKind::Binary(binary) => {
            walk_with(&binary.left, visitor);
            walk_with(&binary.right, visitor);
        }
        UnitKind::Unary(unary) => walk_with(&unary.operand, visitor),
        UnitKind::Group(group) => {
            for element in &group.elements {
                walk_with(element, visitor);
            }
        }
        UnitKind::Call(call) => {
            for argument in &call.arguments {
                walk_with(argument, visitor);
            }
        }
        UnitKind::ImplicitCall(call) => {
            walk_with(&call.callee, visitor);
            for argument in &call.arguments {
                walk_with(argument, visitor);
            }
        }
        UnitKind::Dimensioned(dimensioned) => walk_with(&dimensioned.value, visitor),
        _ => {}
    }
}

/// Pre-order visit with mutable access, for in-place rewriting
pub fn walk_mut<F>(unit: &mut Unit, mut visitor: F)
where
    F: FnMut(&mut Unit) -> bool,
{
    walk_mut_with(unit, &mut visitor);
}

fn walk_mut_with<F>(unit: &mut Unit, visitor: &mut F)
where
    F: FnMut(&mut Unit) -> bool,
{
    if !visitor(unit) {
        return;
    }
    match &mut unit.kind {
        UnitKind::Binary(binary) => {
            walk_mut_with(&mut binary.left, visitor);
            walk_mut_with(&mut binary.right, visitor);
        }
        UnitKind::Unary(unary) => walk_mut_with(&mut unary.operand, visitor),
        UnitKind::Group(group) => {
            for element in &mut group.elements {
                walk_mut_with(element, visitor);
            }
        }
        UnitKind::Call(call) => {
            for argument in &mut call.arguments {
                walk_mut_with(argument, visitor);
            }
        }
        UnitKind::ImplicitCall(call) => {
            walk_mut_with(&mut call.callee, visitor);
            for argument in &mut call.arguments {
                walk_mut_with(argument, visitor);
            }
        }
        UnitKind::Dimensioned(dimensioned) => walk_mut_with(&mut dimensioned.value, visitor),
        _ => {}
    }
}

/// Copy-on-write substitution
///
/// `replace` sees each unit before its children; returning `Some` swaps the
/// whole subtree. Untouched subtrees are shared with the input, and the
/// result is borrowed when nothing changed.
pub fn substitute<'a, F>(unit: &'a Unit, mut replace: F) -> Cow<'a, Unit>
where
    F: FnMut(&Unit) -> Option<Unit>,
{
    substitute_with(unit, &mut replace)
}

fn substitute_with<'a, F>(unit: &'a Unit, replace: &mut F) -> Cow<'a, Unit>
where
    F: FnMut(&Unit) -> Option<Unit>,
{
    if let Some(replacement) = replace(unit) {
        return Cow::Owned(replacement);
    }

    let kind = match &unit.kind {
        UnitKind::Binary(binary) => {
            let left = substitute_with(&binary.left, replace);
            let right = substitute_with(&binary.right, replace);
            if is_borrowed(&left) && is_borrowed(&right) {
                return Cow::Borrowed(unit);
            }
            UnitKind::Binary(Binary {
                operator: binary.operator,
                left: Box::new(left.into_owned()),
                right: Box::new(right.into_owned()),
            })
        }
        UnitKind::Unary(unary) => {
            let operand = substitute_with(&unary.operand, replace);
            if is_borrowed(&operand) {
                return Cow::Borrowed(unit);
            }
            UnitKind::Unary(Unary {
                operator: unary.operator,
                operand: Box::new(operand.into_owned()),
            })
        }
        UnitKind::Group(group) => match substitute_all(&group.elements, replace) {
            Some(elements) => UnitKind::Group(Group {
                explicit: group.explicit,
                elements,
            }),
            None => return Cow::Borrowed(unit),
        },
        UnitKind::Call(call) => match substitute_all(&call.arguments, replace) {
            Some(arguments) => UnitKind::Call(Call {
                name: call.name.clone(),
                arguments,
            }),
            None => return Cow::Borrowed(unit),
        },
        UnitKind::ImplicitCall(call) => {
            let callee = substitute_with(&call.callee, replace);
            let arguments = substitute_all(&call.arguments, replace);
            if is_borrowed(&callee) && arguments.is_none() {
                return Cow::Borrowed(unit);
            }
            UnitKind::ImplicitCall(ImplicitCall {
                callee: Box::new(callee.into_owned()),
                arguments: arguments.unwrap_or_else(|| call.arguments.clone()),
            })
        }
        UnitKind::Dimensioned(dimensioned) => {
            let value = substitute_with(&dimensioned.value, replace);
            if is_borrowed(&value) {
                return Cow::Borrowed(unit);
            }
            UnitKind::Dimensioned(Dimensioned {
                value: Box::new(value.into_owned()),
                unit: dimensioned.unit.clone(),
            })
        }
        _ => return Cow::Borrowed(unit),
    };

    Cow::Owned(unit.with_kind(kind))
}

/// `None` when every unit came back unchanged
fn substitute_all<F>(units: &[Unit], replace: &mut F) -> Option<Vec<Unit>>
where
    F: FnMut(&Unit) -> Option<Unit>,
{
    let results: Vec<Cow<'_, Unit>> = units
        .iter()
        .map(|unit| substitute_with(unit, replace))
        .collect();
    if results.iter().all(is_borrowed) {
        return None;
    }
    Some(results.into_iter().map(Cow::into_owned).collect())
}

fn is_borrowed(unit: &Cow<'_, Unit>) -> bool {
    matches!(unit, Cow::Borrowed(_))
}

impl Unit {
    /// Rebuild this unit with `f` applied to each direct child
    pub fn map_children<F>(self, f: &mut F) -> Unit
    where
        F: FnMut(Unit) -> Unit,
    {
        let Unit { id, span, kind } = self;
        let kind = match kind {
            UnitKind::Binary(Binary {
                operator,
                left,
                right,
            }) => UnitKind::Binary(Binary {
                operator,
                left: Box::new(f(*left)),
                right: Box::new(f(*right)),
            }),
            UnitKind::Unary(Unary { operator, operand }) => UnitKind::Unary(Unary {
                operator,
                operand: Box::new(f(*operand)),
            }),
            UnitKind::Group(Group { explicit, elements }) => UnitKind::Group(Group {
                explicit,
                elements: elements.into_iter().map(&mut *f).collect(),
            }),
            UnitKind::Call(Call { name, arguments }) => UnitKind::Call(Call {
                name,
                arguments: arguments.into_iter().map(&mut *f).collect(),
            }),
            UnitKind::ImplicitCall(ImplicitCall { callee, arguments }) => {
                UnitKind::ImplicitCall(ImplicitCall {
                    callee: Box::new(f(*callee)),
                    arguments: arguments.into_iter().map(&mut *f).collect(),
                })
            }
            UnitKind::Dimensioned(Dimensioned { value, unit }) => {
                UnitKind::Dimensioned(Dimensioned {
                    value: Box::new(f(*value)),
                    unit,
                })
            }
            other => other,
        };
        Unit::new(id, span, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Address, Literal};
    use crate::parse_formula;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_walk_order() {
        let root = parse_formula("=F(A1, B1) + C1").root.unwrap();
        let mut seen = Vec::new();
        walk(&root, |unit| {
            if let UnitKind::Address(address) = &unit.kind {
                seen.push(address.label());
            }
            true
        });
        assert_eq!(seen, ["A1", "B1", "C1"]);
    }

    #[test]
    fn test_walk_can_prune() {
        let root = parse_formula("=F(A1) + C1").root.unwrap();
        let mut addresses = 0;
        walk(&root, |unit| {
            if matches!(unit.kind, UnitKind::Call(_)) {
                return false;
            }
            addresses += usize::from(unit.as_address().is_some());
            true
        });
        assert_eq!(addresses, 1);
    }

    #[test]
    fn test_walk_mut_rewrites_in_place() {
        let mut root = parse_formula("=A1 + B1").root.unwrap();
        walk_mut(&mut root, |unit| {
            if let UnitKind::Address(address) = &mut unit.kind {
                address.absolute_row = true;
            }
            true
        });
        assert_eq!(root.to_string(), "A$1 + B$1");
    }

    #[test]
    fn test_substitute_shares_unchanged_trees() {
        let root = parse_formula("=SUM(1, 2) * 3").root.unwrap();
        let same = substitute(&root, |_| None);
        assert!(matches!(same, Cow::Borrowed(_)));

        let changed = substitute(&root, |unit| {
            unit.as_address()
                .map(|_| unit.with_kind(UnitKind::Literal(Literal::number(0.0))))
        });
        assert!(matches!(changed, Cow::Borrowed(_)));
    }

    #[test]
    fn test_substitute_replaces_subtrees() {
        let root = parse_formula("=SUM(A1, 2) * B2").root.unwrap();
        let replaced = substitute(&root, |unit| match &unit.kind {
            UnitKind::Address(address) if address == &Address::new(0, 0) => {
                Some(unit.with_kind(UnitKind::Literal(Literal::number(7.0))))
            }
            _ => None,
        });
        assert!(matches!(replaced, Cow::Owned(_)));
        assert_eq!(replaced.to_string(), "SUM(7, 2) * B2");
        assert_eq!(root.to_string(), "SUM(A1, 2) * B2");
    }
}
