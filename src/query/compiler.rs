//! Turns parsed terms into filters, and filters into one backend predicate.
//!
//! Filters are kept as a list of groups. Within a group predicates are OR'ed;
//! the groups themselves are AND'ed. Positionally every term forms its own
//! group, so two terms of the same filter name still both have to match.
//! Union-only filters are pulled out of their terms and OR'ed together in a
//! single trailing group.

use super::filters::Filter;
use super::parser::Term;
use crate::error::BadTerm;
use crate::index::body::{Field, Predicate};
use crate::index::types::Domain;
use crate::plugins::PluginSet;
use std::sync::Arc;

/// Outer list AND'ed, inner lists OR'ed
pub type FilterGroups = Vec<Vec<Arc<dyn Filter>>>;

/// Instantiate every registration of each term's name, in registry order.
///
/// Terms with unknown names get an empty group and constrain nothing.
pub fn compile_terms(terms: &[Term], plugins: &PluginSet) -> FilterGroups {
    terms
        .iter()
        .map(|term| {
            plugins
                .filters_named(&term.name)
                .iter()
                .map(|registration| registration.build(term))
                .collect()
        })
        .collect()
}

/// Regroup per-term filters: positional groups first, then one union group
pub fn group_filters(per_term: &FilterGroups) -> FilterGroups {
    let mut groups: FilterGroups = per_term
        .iter()
        .map(|filters| filters.iter().filter(|f| !f.union_only()).cloned().collect())
        .collect();

    let union: Vec<Arc<dyn Filter>> = per_term
        .iter()
        .flatten()
        .filter(|f| f.union_only())
        .cloned()
        .collect();
    if !union.is_empty() {
        groups.push(union);
    }
    groups
}

/// Line domain if any filter works on lines, otherwise file domain
pub fn domain_of(groups: &FilterGroups) -> Domain {
    if groups.iter().flatten().any(|f| f.domain() == Domain::Line) {
        Domain::Line
    } else {
        Domain::File
    }
}

/// AND of ORs over the groups' predicates.
///
/// File-domain queries also exclude rows that only exist as link targets.
/// `Ok(None)` means the query is unconstrained.
pub fn build_predicate(groups: &FilterGroups, domain: Domain) -> Result<Option<Predicate>, BadTerm> {
    let mut ands = Vec::with_capacity(groups.len() + 1);
    for group in groups {
        let mut ors = Vec::with_capacity(group.len());
        for filter in group {
            if let Some(predicate) = filter.filter()? {
                ors.push(predicate);
            }
        }
        if !ors.is_empty() {
            ands.push(Predicate::Or(ors));
        }
    }

    if domain == Domain::File {
        ands.push(Predicate::not(Predicate::Exists { field: Field::Link }));
    }

    Ok(if ands.is_empty() {
        None
    } else {
        Some(Predicate::And(ands))
    })
}

/// A composed query ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    pub predicate: Option<Predicate>,
    pub domain: Domain,
}

/// Group, decide the domain and build the predicate in one step
pub fn compose(per_term: &FilterGroups) -> Result<(FilterGroups, Composed), BadTerm> {
    let groups = group_filters(per_term);
    let domain = domain_of(&groups);
    let predicate = build_predicate(&groups, domain)?;
    Ok((groups, Composed { predicate, domain }))
}
