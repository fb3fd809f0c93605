// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural operations over schema-bound values.
//!
//! These are the read/write/partial-write/delete primitives the SPINE
//! dispatcher is built on. Semantics worth keeping in mind:
//!
//! - *selectors* pick which list items an operation applies to: every
//!   non-absent selector field must equal the item's same-named field,
//!   absent selector fields are wildcards;
//! - an *elements mask* picks which fields of each item apply: a present
//!   tag at a leaf means "this field", an empty sub-sequence means "that
//!   subtree wholesale";
//! - *identifiers* are the schema-flagged key fields that drive list
//!   merging.

use log::error;

use crate::data::cfg::{DataCfg, DataKind};
use crate::data::value::Value;
use crate::error::{Error, Result};

/// The field carries no JSON element (absent). Stubs are always null;
/// a choice is null when it has no payload.
pub fn is_null(cfg: &DataCfg, value: Option<&Value>) -> bool {
    match &cfg.kind {
        DataKind::Stub => true,
        DataKind::Choice(arms) => match value {
            Some(Value::Choice { arm, value }) => match arms.get(*arm) {
                Some(arm_cfg) => is_null(arm_cfg, value.as_deref()),
                None => true,
            },
            _ => true,
        },
        DataKind::ChoiceRoot(inner) => is_null(inner, value),
        _ => value.is_none(),
    }
}

/// The field is present but carries no substantive value: a sequence with
/// every child absent, or a choice whose payload is empty. Scalars are
/// never empty; lists are never empty (an empty array is still present).
pub fn is_empty(cfg: &DataCfg, value: Option<&Value>) -> bool {
    match &cfg.kind {
        DataKind::Sequence(_) | DataKind::Container(_) => match value {
            Some(Value::Seq(slots)) => {
                let children = match cfg.children() {
                    Some(children) => children,
                    None => return false,
                };
                children
                    .iter()
                    .zip(slots.iter())
                    .all(|(child, slot)| is_null(child, slot.as_ref()))
            }
            _ => false,
        },
        DataKind::Choice(arms) => match value {
            Some(Value::Choice { arm, value }) => arms
                .get(*arm)
                .is_some_and(|arm_cfg| is_empty(arm_cfg, value.as_deref())),
            _ => false,
        },
        DataKind::ChoiceRoot(inner) => is_empty(inner, value),
        _ => false,
    }
}

/// Structural equality. Kind groups must match; sequences compare
/// field-wise, lists compare length then element-wise, absence on either
/// side collapses to "both absent".
pub fn compare(a_cfg: &DataCfg, a: Option<&Value>, b_cfg: &DataCfg, b: Option<&Value>) -> bool {
    if a_cfg.kind_group() != b_cfg.kind_group() {
        return false;
    }

    match (&a_cfg.kind, &b_cfg.kind) {
        (DataKind::Stub, _) => true,
        (DataKind::Tag, _) => is_null(a_cfg, a) == is_null(b_cfg, b),
        (DataKind::Sequence(_) | DataKind::Container(_), _) => {
            let (Some(Value::Seq(a_slots)), Some(Value::Seq(b_slots))) = (a, b) else {
                return a.is_none() && b.is_none();
            };

            let a_children = a_cfg.children().unwrap_or(&[]);
            let b_children = b_cfg.children().unwrap_or(&[]);
            if a_children.len() != b_children.len() {
                return false;
            }

            a_children
                .iter()
                .zip(b_children)
                .zip(a_slots.iter().zip(b_slots))
                .all(|((ac, bc), (av, bv))| compare(ac, av.as_ref(), bc, bv.as_ref()))
        }
        (DataKind::List(a_element), DataKind::List(b_element)) => {
            let (Some(Value::List(a_items)), Some(Value::List(b_items))) = (a, b) else {
                return a.is_none() && b.is_none();
            };

            a_items.len() == b_items.len()
                && a_items
                    .iter()
                    .zip(b_items)
                    .all(|(av, bv)| compare(a_element, Some(av), b_element, Some(bv)))
        }
        (DataKind::Choice(a_arms), DataKind::Choice(b_arms)) => {
            let (
                Some(Value::Choice { arm: a_arm, value: a_payload }),
                Some(Value::Choice { arm: b_arm, value: b_payload }),
            ) = (a, b)
            else {
                return a.is_none() && b.is_none();
            };

            let (Some(a_arm_cfg), Some(b_arm_cfg)) = (a_arms.get(*a_arm), b_arms.get(*b_arm))
            else {
                error!("choice discriminator out of range in compare");
                return false;
            };

            compare(a_arm_cfg, a_payload.as_deref(), b_arm_cfg, b_payload.as_deref())
        }
        (DataKind::ChoiceRoot(a_inner), DataKind::ChoiceRoot(b_inner)) => {
            compare(a_inner, a, b_inner, b)
        }
        _ => match (a, b) {
            (None, None) => true,
            (Some(av), Some(bv)) => av == bv,
            _ => false,
        },
    }
}

/// The field itself is flagged Identifier, or any present sub-field is.
/// Lists consult their element *schema* (not the first element's values).
pub fn has_identifiers(cfg: &DataCfg, value: Option<&Value>) -> bool {
    match &cfg.kind {
        DataKind::Sequence(_) | DataKind::Container(_) => {
            let Some(Value::Seq(slots)) = value else {
                return false;
            };

            if cfg.is_identifier() {
                return true;
            }

            let children = cfg.children().unwrap_or(&[]);
            children
                .iter()
                .zip(slots.iter())
                .any(|(child, slot)| has_identifiers(child, slot.as_ref()))
        }
        DataKind::List(element) => match value {
            Some(Value::List(items)) if !items.is_empty() => element.declares_identifiers(),
            _ => false,
        },
        DataKind::Stub => false,
        DataKind::Choice(_) | DataKind::ChoiceRoot(_) => {
            error!("has_identifiers is undefined for choices");
            false
        }
        _ => !is_null(cfg, value) && cfg.is_identifier(),
    }
}

/// Selectors semantics: for each non-absent selector field whose name
/// matches a field of `cfg`, require equality. Only defined for sequence
/// targets; absent selector fields act as wildcards.
pub fn selectors_match(
    cfg: &DataCfg,
    value: Option<&Value>,
    selectors_cfg: &DataCfg,
    selectors: Option<&Value>,
) -> bool {
    let Some(selector_children) = selectors_cfg.children() else {
        return false;
    };
    if cfg.children().is_none() {
        return false;
    }

    let Some(Value::Seq(selector_slots)) = selectors else {
        // No selector fields: everything matches.
        return true;
    };

    for (selector_cfg, selector_slot) in selector_children.iter().zip(selector_slots.iter()) {
        if is_null(selector_cfg, selector_slot.as_ref()) {
            continue;
        }

        // Selector arms with no counterpart in the data schema are skipped.
        let Some((index, data_child)) = cfg.child_named(selector_cfg.name) else {
            continue;
        };

        let data_slot = match value {
            Some(Value::Seq(slots)) => slots.get(index).and_then(Option::as_ref),
            _ => None,
        };

        if !compare(data_child, data_slot, selector_cfg, selector_slot.as_ref()) {
            return false;
        }
    }

    true
}

/// Identifier matching: non-identifier fields and absent source fields are
/// ignored; identifier fields require scalar equality.
pub fn identifiers_match(cfg: &DataCfg, value: Option<&Value>, src: Option<&Value>) -> bool {
    match &cfg.kind {
        DataKind::Sequence(_) | DataKind::Container(_) => {
            if cfg.is_identifier() {
                return compare(cfg, value, cfg, src);
            }

            if !has_identifiers(cfg, src) {
                return true;
            }

            let Some(Value::Seq(value_slots)) = value else {
                return false;
            };
            let Some(Value::Seq(src_slots)) = src else {
                return true;
            };

            let children = cfg.children().unwrap_or(&[]);
            children
                .iter()
                .zip(value_slots.iter().zip(src_slots.iter()))
                .all(|(child, (v, s))| identifiers_match(child, v.as_ref(), s.as_ref()))
        }
        DataKind::Stub => false,
        DataKind::Choice(_) | DataKind::ChoiceRoot(_) => {
            error!("identifiers_match is undefined for choices");
            false
        }
        _ => {
            if !cfg.is_identifier() {
                return true;
            }
            if is_null(cfg, src) {
                return true;
            }
            compare(cfg, value, cfg, src)
        }
    }
}

/// Overwrite `dst` with a deep copy of `src` (absence included).
pub fn write(_cfg: &DataCfg, dst: &mut Option<Value>, src: Option<&Value>) -> Result<()> {
    *dst = src.cloned();
    Ok(())
}

/// For every non-absent field of `src`, overwrite the corresponding field
/// of `dst`; absent source fields leave `dst` untouched.
pub fn write_elements(cfg: &DataCfg, dst: &mut Option<Value>, src: Option<&Value>) -> Result<()> {
    if is_null(cfg, src) {
        return Ok(());
    }

    match &cfg.kind {
        DataKind::Sequence(_) | DataKind::Container(_) => {
            let children = cfg.children().ok_or(Error::Other("sequence schema"))?;
            let Some(Value::Seq(src_slots)) = src else {
                return Err(Error::Other("sequence value shape"));
            };

            let dst_value =
                dst.get_or_insert_with(|| Value::empty_seq(children.len()));
            let Some(dst_slots) = dst_value.as_seq_mut() else {
                return Err(Error::Other("sequence value shape"));
            };

            for (child, (dst_slot, src_slot)) in
                children.iter().zip(dst_slots.iter_mut().zip(src_slots.iter()))
            {
                write_elements(child, dst_slot, src_slot.as_ref())?;
            }

            Ok(())
        }
        _ => write(cfg, dst, src),
    }
}

/// Partial write over a container-of-list (or a plain overwrite for other
/// kinds). The three list cases, in order: selectors present -> write
/// `src[0]`'s non-absent fields onto matching items; source without
/// identifiers -> broadcast `src[0]` onto all items; otherwise merge
/// keyed on identifiers (overwrite matched, append unmatched).
pub fn write_partial(
    cfg: &DataCfg,
    dst: &mut Option<Value>,
    src: Option<&Value>,
    selectors_cfg: &DataCfg,
    selectors: Option<&Value>,
) -> Result<()> {
    match &cfg.kind {
        DataKind::Container(inner) => {
            if !inner.is_list() {
                error!("container payload is not a list");
                return Err(Error::InputArgument);
            }

            let Some(Value::Seq(src_slots)) = src else {
                return Err(Error::InputArgument);
            };
            let src_inner = src_slots.first().and_then(Option::as_ref);
            if src_inner.is_none() {
                return Err(Error::InputArgument);
            }

            let dst_value = dst.get_or_insert_with(|| Value::empty_seq(1));
            let Some(dst_slots) = dst_value.as_seq_mut() else {
                return Err(Error::Other("container value shape"));
            };

            write_partial(inner, &mut dst_slots[0], src_inner, selectors_cfg, selectors)
        }
        DataKind::List(element) => {
            list_write_partial(element, dst, src, selectors_cfg, selectors)
        }
        _ => write_elements(cfg, dst, src),
    }
}

fn list_write_partial(
    element: &'static DataCfg,
    dst: &mut Option<Value>,
    src: Option<&Value>,
    selectors_cfg: &DataCfg,
    selectors: Option<&Value>,
) -> Result<()> {
    let src_items: &[Value] = match src {
        Some(Value::List(items)) => items,
        None => &[],
        Some(_) => return Err(Error::Other("list value shape")),
    };

    let dst_value = dst.get_or_insert_with(|| Value::List(Vec::new()));
    let Some(dst_items) = dst_value.as_list_mut() else {
        return Err(Error::Other("list value shape"));
    };

    if !is_null(selectors_cfg, selectors) {
        // Case 1: write src[0]'s fields onto the selected items.
        let Some(first) = src_items.first() else {
            return Ok(());
        };
        for item in dst_items.iter_mut() {
            if selectors_match(element, Some(item), selectors_cfg, selectors) {
                let mut slot = Some(item.clone());
                write_elements(element, &mut slot, Some(first))?;
                *item = slot.ok_or(Error::Other("element write emptied item"))?;
            }
        }
        return Ok(());
    }

    let src_has_identifiers = !src_items.is_empty() && element.declares_identifiers();

    if !src_has_identifiers {
        // Case 2: broadcast src[0] to every item.
        let Some(first) = src_items.first() else {
            return Ok(());
        };
        for item in dst_items.iter_mut() {
            let mut slot = Some(item.clone());
            write_elements(element, &mut slot, Some(first))?;
            *item = slot.ok_or(Error::Other("element write emptied item"))?;
        }
        return Ok(());
    }

    // Case 3: merge on identifiers.
    for src_item in src_items {
        let matched = dst_items
            .iter_mut()
            .find(|item| identifiers_match(element, Some(item), Some(src_item)));

        match matched {
            Some(item) => {
                let mut slot = Some(item.clone());
                write_elements(element, &mut slot, Some(src_item))?;
                *item = slot.ok_or(Error::Other("element write emptied item"))?;
            }
            None => dst_items.push(src_item.clone()),
        }
    }

    Ok(())
}

/// Into `dst`, copy from `src` exactly the fields flagged present in the
/// elements mask. A present tag at a leaf copies that leaf; an empty
/// sub-sequence copies that subtree wholesale. No-op for an absent mask.
pub fn read_elements(
    cfg: &DataCfg,
    src: Option<&Value>,
    dst: &mut Option<Value>,
    elements_cfg: &DataCfg,
    elements: Option<&Value>,
) -> Result<()> {
    match &cfg.kind {
        DataKind::Sequence(_) | DataKind::Container(_) => {
            if elements_cfg.children().is_none() {
                return Err(Error::InputArgument);
            }

            if is_null(cfg, src) || is_null(elements_cfg, elements) {
                // Nothing to be read.
                return Ok(());
            }

            if is_empty(elements_cfg, elements) {
                *dst = src.cloned();
                return Ok(());
            }

            let children = cfg.children().unwrap_or(&[]);
            let element_children = elements_cfg.children().unwrap_or(&[]);
            let Some(Value::Seq(src_slots)) = src else {
                return Err(Error::Other("sequence value shape"));
            };
            let Some(Value::Seq(element_slots)) = elements else {
                return Err(Error::Other("sequence value shape"));
            };

            let dst_value =
                dst.get_or_insert_with(|| Value::empty_seq(children.len()));
            let Some(dst_slots) = dst_value.as_seq_mut() else {
                return Err(Error::Other("sequence value shape"));
            };

            for (((child, element_child), (src_slot, element_slot)), dst_slot) in children
                .iter()
                .zip(element_children)
                .zip(src_slots.iter().zip(element_slots.iter()))
                .zip(dst_slots.iter_mut())
            {
                if is_null(element_child, element_slot.as_ref()) {
                    continue;
                }

                if is_empty(element_child, element_slot.as_ref()) {
                    *dst_slot = src_slot.clone();
                } else {
                    read_elements(
                        child,
                        src_slot.as_ref(),
                        dst_slot,
                        element_child,
                        element_slot.as_ref(),
                    )?;
                }
            }

            Ok(())
        }
        _ => {
            if is_null(elements_cfg, elements) {
                return Ok(());
            }
            write(cfg, dst, src)
        }
    }
}

/// Delete every field flagged in the mask (dual of [`read_elements`]).
pub fn delete_elements(
    cfg: &DataCfg,
    value: &mut Option<Value>,
    elements_cfg: &DataCfg,
    elements: Option<&Value>,
) {
    match &cfg.kind {
        DataKind::Sequence(_) | DataKind::Container(_) => {
            if elements_cfg.children().is_none() {
                return;
            }

            if is_null(cfg, value.as_ref()) || is_null(elements_cfg, elements) {
                return;
            }

            if is_empty(elements_cfg, elements) {
                *value = None;
                return;
            }

            let children = cfg.children().unwrap_or(&[]);
            let element_children = elements_cfg.children().unwrap_or(&[]);
            let Some(Value::Seq(element_slots)) = elements else {
                return;
            };
            let Some(Value::Seq(value_slots)) = value.as_mut() else {
                return;
            };

            for ((child, element_child), (value_slot, element_slot)) in children
                .iter()
                .zip(element_children)
                .zip(value_slots.iter_mut().zip(element_slots.iter()))
            {
                if is_null(element_child, element_slot.as_ref()) {
                    continue;
                }

                if is_empty(element_child, element_slot.as_ref()) {
                    *value_slot = None;
                } else {
                    delete_elements(child, value_slot, element_child, element_slot.as_ref());
                }
            }
        }
        DataKind::Choice(_) | DataKind::ChoiceRoot(_) => {
            error!("delete_elements is undefined for choices");
        }
        _ => {
            if !is_null(elements_cfg, elements) {
                *value = None;
            }
        }
    }
}

/// Partial delete over a container-of-list: selectors without elements
/// drop the matching items, an elements mask deletes fields from each
/// matched item (all items when selectors are absent), neither is a no-op.
pub fn delete_partial(
    cfg: &DataCfg,
    value: &mut Option<Value>,
    selectors_cfg: &DataCfg,
    selectors: Option<&Value>,
    elements_cfg: &DataCfg,
    elements: Option<&Value>,
) {
    match &cfg.kind {
        DataKind::Container(inner) => {
            if !inner.is_list() {
                error!("container payload is not a list");
                return;
            }

            let Some(Value::Seq(slots)) = value else {
                return;
            };
            let Some(inner_slot) = slots.first_mut() else {
                return;
            };

            delete_partial(inner, inner_slot, selectors_cfg, selectors, elements_cfg, elements);
        }
        DataKind::List(element) => {
            let selectors_absent = is_null(selectors_cfg, selectors);
            let elements_absent = is_null(elements_cfg, elements);
            if selectors_absent && elements_absent {
                return;
            }

            let Some(Value::List(items)) = value else {
                return;
            };

            if elements_absent {
                items.retain(|item| {
                    !selectors_match(element, Some(item), selectors_cfg, selectors)
                });
                return;
            }

            for item in items.iter_mut() {
                if selectors_absent
                    || selectors_match(element, Some(item), selectors_cfg, selectors)
                {
                    let mut slot = Some(item.clone());
                    delete_elements(element, &mut slot, elements_cfg, elements);
                    if let Some(updated) = slot {
                        *item = updated;
                    }
                }
            }
        }
        _ => delete_elements(cfg, value, elements_cfg, elements),
    }
}

/// Copy only the list items matching `to_match` (selectors semantics) into
/// `dst`; other kinds copy wholesale.
pub fn copy_matching(
    cfg: &DataCfg,
    src: Option<&Value>,
    dst: &mut Option<Value>,
    to_match: Option<&Value>,
) -> Result<()> {
    match &cfg.kind {
        DataKind::Container(inner) => {
            if !inner.is_list() {
                error!("container payload is not a list");
                return Err(Error::InputArgument);
            }

            let Some(Value::Seq(src_slots)) = src else {
                return Err(Error::InputArgument);
            };

            let dst_value = dst.get_or_insert_with(|| Value::empty_seq(1));
            let Some(dst_slots) = dst_value.as_seq_mut() else {
                return Err(Error::Other("container value shape"));
            };

            copy_matching(
                inner,
                src_slots.first().and_then(Option::as_ref),
                &mut dst_slots[0],
                to_match,
            )
        }
        DataKind::List(element) => {
            let Some(Value::List(src_items)) = src else {
                *dst = None;
                return Ok(());
            };

            let matched: Vec<Value> = src_items
                .iter()
                .filter(|item| selectors_match(element, Some(item), element, to_match))
                .cloned()
                .collect();

            *dst = if matched.is_empty() {
                None
            } else {
                Some(Value::List(matched))
            };
            Ok(())
        }
        _ => write(cfg, dst, src),
    }
}
