//! JavaScript filters, backed by needles from the js analyzer.

use super::names::{register, NeedleKind};
use super::Plugin;

pub const PLUGIN_NAME: &str = "js";

const FILTERS: &[NeedleKind] = &[
    NeedleKind::qualified("prop", "JavaScript property definition filter: prop:foo").identifier(),
    NeedleKind::qualified("prop-ref", "References to JavaScript object properties"),
    NeedleKind::qualified("var", "Variable definition: var:foo").identifier(),
    NeedleKind::qualified("var-ref", "Variable references"),
    NeedleKind::qualified("id", "Definition of a property or variable: id:foo").identifier(),
    NeedleKind::qualified("ref", "References to a property or variable"),
];

pub fn plugin() -> Plugin {
    let mut plugin = Plugin::new(PLUGIN_NAME);
    register(&mut plugin, PLUGIN_NAME, FILTERS);
    plugin
}
