use super::node::{Call, Node};
use crate::analysis::paths::{base, parent};
use crate::analysis::TargetFacts;
use crate::config::{PathConfig, SupportConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Test,
    Library,
}

impl RuleKind {
    pub fn function(&self) -> &'static str {
        match self {
            RuleKind::Test => "cc_test",
            RuleKind::Library => "cc_library",
        }
    }
}

pub struct RuleSynthesizer<'a> {
    paths: &'a PathConfig,
    support: &'a SupportConfig,
}

impl<'a> RuleSynthesizer<'a> {
    pub fn new(paths: &'a PathConfig, support: &'a SupportConfig) -> Self {
        Self { paths, support }
    }

    /// Rule tree for one test target.
    pub fn test_rule(&self, name: &str, facts: &TargetFacts) -> Call {
        let srcs: Vec<String> = facts.sources.iter().map(|s| self.source_label(s)).collect();
        let support = self.support.label();
        let mut deps = vec![support.clone()];
        deps.extend(
            facts
                .dependencies
                .iter()
                .filter(|dep| **dep != support)
                .cloned(),
        );

        Call::new(RuleKind::Test.function())
            .arg("name", Node::string(name))
            .arg("srcs", Node::strings(&srcs))
            .arg("deps", Node::strings(&deps))
            .list_arg("copts", &facts.copts)
            .list_arg("tags", &facts.tags)
    }

    /// Rendered `cc_test` text for one target.
    pub fn render_test(&self, name: &str, facts: &TargetFacts) -> String {
        self.test_rule(name, facts).render()
    }

    /// The support library every test links against.
    pub fn support_rule(&self) -> Call {
        Call::new(RuleKind::Library.function())
            .arg("name", Node::string(&self.support.name))
            .arg("defines", Node::strings(&self.support.defines))
            .arg("linkopts", Node::strings(&self.support.linkopts))
            .arg("deps", Node::strings(&self.support.deps))
    }

    /// License header followed by the support library.
    pub fn preamble(&self) -> String {
        let mut out = String::new();
        if !self.support.license_header.is_empty() {
            out.push_str(&self.support.license_header);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str(&self.support_rule().render());
        out.push('\n');
        out
    }

    /// Files next to the tests are referenced locally, everything else by
    /// package label.
    fn source_label(&self, path: &str) -> String {
        if parent(path) == self.paths.test_sources_dir {
            format!(":{}", base(path))
        } else {
            file_label(path)
        }
    }
}

pub fn dir_label(dir: &str) -> String {
    if dir == "." {
        "//".to_string()
    } else {
        format!("//{}", dir)
    }
}

pub fn file_label(path: &str) -> String {
    format!("{}:{}", dir_label(parent(path)), base(path))
}
