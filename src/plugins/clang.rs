//! C and C++ filters, backed by needles from the clang analyzer.

use super::names::{register, NeedleKind};
use super::Plugin;

pub const PLUGIN_NAME: &str = "clang";

/// Needle key prefix
pub const LANG: &str = "c";

const FILTERS: &[NeedleKind] = &[
    NeedleKind::qualified("function", "Function or method definition: function:foo").identifier(),
    NeedleKind::qualified("function-ref", "Function or method references"),
    NeedleKind::qualified("function-decl", "Function or method declaration"),
    NeedleKind::qualified("type-ref", "Type or class references, uses, or instantiations"),
    NeedleKind::qualified("type-decl", "Type or class declaration"),
    NeedleKind::qualified("type", "Type or class definition: type:Stack").identifier(),
    NeedleKind::qualified("var", "Variable definition").identifier(),
    NeedleKind::qualified("var-ref", "Variable uses (lvalue, rvalue, dereference, etc.)"),
    NeedleKind::qualified("var-decl", "Variable declaration"),
    NeedleKind::name("macro", "Macro definition").identifier(),
    NeedleKind::name("macro-ref", "Macro uses"),
    NeedleKind::qualified("namespace", "Namespace definition").identifier(),
    NeedleKind::qualified("namespace-ref", "Namespace references"),
    NeedleKind::qualified("namespace-alias", "Namespace alias").identifier(),
    NeedleKind::qualified("namespace-alias-ref", "Namespace alias references"),
    NeedleKind::name("warning", "Compiler warning messages"),
    NeedleKind::name(
        "warning-opt",
        "Warning messages brought on by a given compiler command-line option",
    ),
    NeedleKind::qualified(
        "callers",
        "Calls to the given function or method: callers:GetStringFromName",
    )
    .stored_as("call"),
    NeedleKind::qualified("bases", "Superclasses of a class: bases:SomeSubclass"),
    NeedleKind::qualified("derived", "Subclasses of a class: derived:SomeSuperclass"),
    NeedleKind::qualified(
        "member",
        "Member variables, types, or methods of a class: member:SomeClass",
    ),
    NeedleKind::qualified(
        "overrides",
        "Methods which override the given one: overrides:someMethod",
    ),
    NeedleKind::qualified(
        "overridden",
        "Methods which are overridden by the given one. Useful mostly with fully qualified methods, like +overridden:Derived::foo().",
    ),
];

pub fn plugin() -> Plugin {
    let mut plugin = Plugin::new(PLUGIN_NAME);
    register(&mut plugin, LANG, FILTERS);
    plugin
}
