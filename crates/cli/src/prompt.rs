//! Per-node prompt fields for code generation.
//!
//! Each ordered node becomes a small template (`Name`, `Type`,
//! `Description`, `Inputs`, `Outputs`, `Endpoints`) sent together with one
//! of two system prompts, depending on whether the node lives in a UI space.
//! Data spaces use the short form: `Name`, `Type`, `Description`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anglish_core::{Direction, GraphNode, Identifier, Kind, Node, Ordering, PathDecl, SpaceType};
use serde::Serialize;

/// Field names in template order.
pub const TEMPLATE_FIELDS: [&str; 6] = [
    "Name",
    "Type",
    "Description",
    "Inputs",
    "Outputs",
    "Endpoints",
];

const FUNC_SPACE_SYSTEM: &str = "\
You implement functions described in a plain-English contract. \
You receive one function at a time with its name, description, inputs, outputs \
and the paths it can reach. Dependencies are always delivered before the \
functions that use them. Reply with the implementation only.";

const UI_SPACE_SYSTEM: &str = "\
You build user interface components described in a plain-English contract. \
You receive one component at a time with its name, description, inputs, \
outputs and the paths it can reach. Components it depends on are always \
delivered first. Reply with the component code only.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemPrompt {
    Func,
    Ui,
}

impl SystemPrompt {
    /// File stem looked up in a prompts directory.
    pub fn file_stem(self) -> &'static str {
        match self {
            SystemPrompt::Func => "func_space_agent_system",
            SystemPrompt::Ui => "ui_space_agent_system",
        }
    }

    pub fn builtin(self) -> &'static str {
        match self {
            SystemPrompt::Func => FUNC_SPACE_SYSTEM,
            SystemPrompt::Ui => UI_SPACE_SYSTEM,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to read prompt file {}: {source}", .path.display())]
pub struct PromptError {
    path: PathBuf,
    source: std::io::Error,
}

/// The system prompt texts for one run.
#[derive(Debug, Clone)]
pub struct SystemPrompts {
    func: String,
    ui: String,
}

impl Default for SystemPrompts {
    fn default() -> Self {
        SystemPrompts {
            func: SystemPrompt::Func.builtin().to_string(),
            ui: SystemPrompt::Ui.builtin().to_string(),
        }
    }
}

impl SystemPrompts {
    /// Built-in texts, or `<dir>/<stem>.md` for each prompt when `dir` is
    /// given. Every file must exist once a directory is named.
    pub fn load(dir: Option<&Path>) -> Result<Self, PromptError> {
        let Some(dir) = dir else {
            return Ok(SystemPrompts::default());
        };
        let read = |which: SystemPrompt| {
            let path = dir.join(format!("{}.md", which.file_stem()));
            tracing::debug!(path = %path.display(), "loading system prompt");
            std::fs::read_to_string(&path).map_err(|source| PromptError { path, source })
        };
        Ok(SystemPrompts {
            func: read(SystemPrompt::Func)?,
            ui: read(SystemPrompt::Ui)?,
        })
    }

    pub fn text(&self, which: SystemPrompt) -> &str {
        match which {
            SystemPrompt::Func => &self.func,
            SystemPrompt::Ui => &self.ui,
        }
    }
}

/// Everything needed to ask the endpoint about one node.
#[derive(Debug, Clone, Serialize)]
pub struct PromptRequest {
    pub ident: Identifier,
    pub system: SystemPrompt,
    pub fields: BTreeMap<String, String>,
}

/// One request per ordered node, in dependency order. `only` narrows the
/// result to nodes whose identifier (`$name`) or bare name matches.
pub fn build_requests(ordering: &Ordering<'_>, only: Option<&str>) -> Vec<PromptRequest> {
    ordering
        .ordered()
        .filter(|n| match only {
            Some(want) => {
                let ident = n.node.ident();
                ident.to_string() == want || ident.name == want
            }
            None => true,
        })
        .map(|n| PromptRequest {
            ident: n.node.ident().clone(),
            system: system_for(ordering, n),
            fields: fields_for(ordering, n),
        })
        .collect()
}

/// The space a node belongs to: itself for a space, the enclosing space
/// for nested members.
fn home_space<'o, 'a>(ordering: &'o Ordering<'a>, node: &'o GraphNode<'a>) -> Option<&'o GraphNode<'a>> {
    match node.node {
        Node::Space(_) => Some(node),
        _ => node.parent.map(|p| ordering.node(p)),
    }
}

fn in_ui_space(ordering: &Ordering<'_>, node: &GraphNode<'_>) -> bool {
    matches!(
        home_space(ordering, node).map(|s| s.node),
        Some(Node::Space(space)) if space.space_type == SpaceType::Ui
    )
}

fn system_for(ordering: &Ordering<'_>, node: &GraphNode<'_>) -> SystemPrompt {
    if in_ui_space(ordering, node) {
        SystemPrompt::Ui
    } else {
        SystemPrompt::Func
    }
}

pub fn fields_for(ordering: &Ordering<'_>, node: &GraphNode<'_>) -> BTreeMap<String, String> {
    let ident = node.node.ident();
    let description = node.node.vibe().prose.join("\n");

    if let Node::Space(space) = node.node {
        if space.space_type == SpaceType::Data {
            let mut fields = BTreeMap::new();
            fields.insert("Name".to_string(), ident.name.clone());
            fields.insert("Type".to_string(), "Data".to_string());
            fields.insert("Description".to_string(), description);
            return fields;
        }
    }

    let kind = match ident.kind {
        Kind::Task if in_ui_space(ordering, node) => "Component",
        Kind::Task => "Function",
        Kind::Space => "Space",
        Kind::Agent => "Agent",
        Kind::Path => "Path",
    };

    let params = |dir: Direction| {
        node.node
            .params()
            .iter()
            .filter(|p| p.direction == dir)
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut fields = BTreeMap::new();
    fields.insert("Name".to_string(), ident.name.clone());
    fields.insert("Type".to_string(), kind.to_string());
    fields.insert("Description".to_string(), description);
    fields.insert("Inputs".to_string(), params(Direction::In));
    fields.insert("Outputs".to_string(), params(Direction::Out));
    fields.insert("Endpoints".to_string(), endpoints(ordering, node));
    fields
}

/// Paths touching the node's space, as `=path: @src -> @dest`. A path
/// lists itself.
fn endpoints(ordering: &Ordering<'_>, node: &GraphNode<'_>) -> String {
    if let Node::Path(p) = node.node {
        return describe_path(p);
    }
    let Some(space) = home_space(ordering, node) else {
        return String::new();
    };
    let name = &space.node.ident().name;
    ordering
        .nodes
        .iter()
        .filter_map(|n| match n.node {
            Node::Path(p) if &p.source.name == name || &p.dest.name == name => {
                Some(describe_path(p))
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_path(p: &PathDecl) -> String {
    format!("{}: @{} -> @{}", p.ident, p.source.name, p.dest.name)
}

/// The user message: a heading naming the type, then one `Key: value`
/// line per field present, in template order.
pub fn render_fields(fields: &BTreeMap<String, String>) -> String {
    let kind = fields.get("Type").map(String::as_str).unwrap_or_default();
    let mut out = format!("{}:", kind);
    for key in TEMPLATE_FIELDS {
        if let Some(value) = fields.get(key) {
            out.push('\n');
            out.push_str(format!("{}: {}", key, value).trim_end());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anglish_core::{order, parse};

    const SRC: &str = "\
=orders:INVOKE(@shop, @shop)
> Checkout calls.
@shop:UI (in=%cart)
> The storefront.
$checkout(in=%cart, out=%receipt)
> Totals %cart.
> Prints a receipt.
#clerk:DF
> Helps.
";

    #[test]
    fn tasks_in_ui_spaces_are_components() {
        let (contract, _) = parse(SRC);
        let ordering = order(&contract);
        let reqs = build_requests(&ordering, Some("$checkout"));
        assert_eq!(reqs.len(), 1);
        let f = &reqs[0].fields;
        assert_eq!(f["Name"], "checkout");
        assert_eq!(f["Type"], "Component");
        assert_eq!(f["Description"], "Totals %cart.\nPrints a receipt.");
        assert_eq!(f["Inputs"], "in=%cart");
        assert_eq!(f["Outputs"], "out=%receipt");
        assert_eq!(f["Endpoints"], "=orders: @shop -> @shop");
        assert_eq!(reqs[0].system, SystemPrompt::Ui);
    }

    #[test]
    fn requests_follow_dependency_order() {
        let (contract, _) = parse(SRC);
        let ordering = order(&contract);
        let names: Vec<String> = build_requests(&ordering, None)
            .iter()
            .map(|r| r.ident.to_string())
            .collect();
        assert_eq!(names, vec!["#clerk", "$checkout", "@shop", "=orders"]);
    }

    #[test]
    fn bare_names_select_nodes() {
        let (contract, _) = parse(SRC);
        let ordering = order(&contract);
        let reqs = build_requests(&ordering, Some("orders"));
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].fields["Type"], "Path");
        assert_eq!(reqs[0].fields["Endpoints"], "=orders: @shop -> @shop");
        assert!(build_requests(&ordering, Some("nothing")).is_empty());
    }

    #[test]
    fn tasks_outside_ui_spaces_are_functions() {
        let (contract, _) = parse("@svc:FUNC\n$run\n> Does it.\n");
        let ordering = order(&contract);
        let reqs = build_requests(&ordering, Some("run"));
        assert_eq!(reqs[0].fields["Type"], "Function");
        assert_eq!(reqs[0].fields["Endpoints"], "");
        assert_eq!(reqs[0].system, SystemPrompt::Func);
    }

    #[test]
    fn data_spaces_use_the_short_template() {
        let (contract, _) = parse("@ledger:DATA (in=%entry)\n> Every sale, forever.\n");
        let ordering = order(&contract);
        let reqs = build_requests(&ordering, Some("@ledger"));
        assert_eq!(reqs[0].fields.len(), 3);
        assert_eq!(
            render_fields(&reqs[0].fields),
            "Data:\nName: ledger\nType: Data\nDescription: Every sale, forever."
        );
    }

    #[test]
    fn system_prompts_load_from_a_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("func_space_agent_system.md"), "write rust").unwrap();
        std::fs::write(dir.path().join("ui_space_agent_system.md"), "write html").unwrap();
        let prompts = SystemPrompts::load(Some(dir.path())).unwrap();
        assert_eq!(prompts.text(SystemPrompt::Func), "write rust");
        assert_eq!(prompts.text(SystemPrompt::Ui), "write html");

        let builtin = SystemPrompts::load(None).unwrap();
        assert_eq!(builtin.text(SystemPrompt::Ui), SystemPrompt::Ui.builtin());
    }

    #[test]
    fn missing_prompt_file_names_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("func_space_agent_system.md"), "x").unwrap();
        let err = SystemPrompts::load(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("ui_space_agent_system.md"));
    }

    #[test]
    fn rendered_template() {
        let (contract, _) = parse("@svc:FUNC\n$run(in=%a)\n> Does it.\n");
        let ordering = order(&contract);
        let reqs = build_requests(&ordering, Some("run"));
        assert_eq!(
            render_fields(&reqs[0].fields),
            "Function:\nName: run\nType: Function\nDescription: Does it.\nInputs: in=%a\nOutputs:\nEndpoints:"
        );
    }
}
