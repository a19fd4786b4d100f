//! Executing scene scripts
//!
//! A [`Session`] owns an [`Installer`] over a [`Scene`] plus the script's
//! named flags. Statements run in order; the first failing statement stops
//! the script and leaves the session as it was after the previous one.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::attribute::{self, Attribute, AttributeBatch, Relation};
use crate::config::LayoutConfig;
use crate::error::{find_similar, report, Span};
use crate::install::Installer;
use crate::parser::{AttributeExpr, AttributeHead, Identifier, Modifier, Script, Spanned, Statement, ViewDecl};
use crate::platform::ViewId;
use crate::scene::{Frames, Scene, SceneError};

/// Errors raised while executing a parsed script
#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("Undefined view '{name}'")]
    UndefinedView {
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },

    #[error("Undefined flag '{name}'")]
    UndefinedFlag {
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },

    #[error("View '{name}' is already defined")]
    DuplicateView { name: String, span: Span },

    #[error("Flag '{name}' is already defined")]
    DuplicateFlag { name: String, span: Span },

    #[error("Unknown view property '{key}': use width or height")]
    UnknownProperty { key: String, span: Span },

    #[error("{source}")]
    Scene {
        #[source]
        source: SceneError,
        span: Span,
    },
}

impl ScriptError {
    pub fn span(&self) -> Span {
        match self {
            ScriptError::UndefinedView { span, .. }
            | ScriptError::UndefinedFlag { span, .. }
            | ScriptError::DuplicateView { span, .. }
            | ScriptError::DuplicateFlag { span, .. }
            | ScriptError::UnknownProperty { span, .. }
            | ScriptError::Scene { span, .. } => span.clone(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let message = self.to_string();
        let label = match self {
            ScriptError::UndefinedView { suggestions, .. }
            | ScriptError::UndefinedFlag { suggestions, .. }
                if !suggestions.is_empty() =>
            {
                format!("Did you mean: {}?", suggestions.join(", "))
            }
            _ => message.clone(),
        };
        report(source, filename, self.span(), &message, &label)
    }
}

/// Execution state of one script
pub struct Session {
    installer: Installer<Scene>,
    flags: HashMap<String, Rc<Cell<bool>>>,
}

impl Session {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            installer: Installer::with_config(Scene::new(), config),
            flags: HashMap::new(),
        }
    }

    pub fn installer(&self) -> &Installer<Scene> {
        &self.installer
    }

    pub fn installer_mut(&mut self) -> &mut Installer<Scene> {
        &mut self.installer
    }

    pub fn scene(&self) -> &Scene {
        self.installer.platform()
    }

    /// Current value of a flag.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).map(|cell| cell.get())
    }

    /// Look a live view up by name.
    pub fn view(&self, name: &str) -> Option<ViewId> {
        self.scene().find(name)
    }

    /// Run every statement of `script` in order.
    pub fn execute(&mut self, script: &Script) -> Result<(), ScriptError> {
        for statement in &script.statements {
            self.execute_statement(statement)?;
        }
        Ok(())
    }

    pub fn execute_statement(&mut self, statement: &Spanned<Statement>) -> Result<(), ScriptError> {
        log::trace!("executing {:?}", statement.node);
        match &statement.node {
            Statement::View(decl) => self.declare_view(decl),
            Statement::Attach { view, parent } => {
                let view_id = self.lookup(view)?;
                let parent_id = self.lookup(parent)?;
                self.installer
                    .platform_mut()
                    .attach(view_id, parent_id)
                    .map_err(|source| ScriptError::Scene {
                        source,
                        span: statement.span.clone(),
                    })
            }
            Statement::Detach(view) => {
                let view = self.lookup(view)?;
                self.installer.platform_mut().detach(view);
                Ok(())
            }
            Statement::Remove(view) => {
                let view = self.lookup(view)?;
                self.installer.platform_mut().remove_view(view);
                Ok(())
            }
            Statement::Flag { name, value } => {
                if self.flags.contains_key(name.node.as_str()) {
                    return Err(ScriptError::DuplicateFlag {
                        name: name.node.to_string(),
                        span: name.span.clone(),
                    });
                }
                self.flags
                    .insert(name.node.to_string(), Rc::new(Cell::new(*value)));
                Ok(())
            }
            Statement::Set { name, value } => {
                self.lookup_flag(name)?.set(*value);
                Ok(())
            }
            Statement::Install { view, attributes } => {
                let view = self.lookup(view)?;
                let mut built = Vec::new();
                for expr in attributes {
                    built.extend(self.build(&expr.node)?);
                }
                self.installer.install(view, built);
                Ok(())
            }
            Statement::Reload(view) => {
                let view = self.lookup(view)?;
                self.installer.reload(view);
                Ok(())
            }
            Statement::Clear(view) => {
                let view = self.lookup(view)?;
                self.installer.clear(view);
                Ok(())
            }
        }
    }

    fn declare_view(&mut self, decl: &ViewDecl) -> Result<(), ScriptError> {
        if self.view(decl.name.node.as_str()).is_some() {
            return Err(ScriptError::DuplicateView {
                name: decl.name.node.to_string(),
                span: decl.name.span.clone(),
            });
        }
        let mut width = None;
        let mut height = None;
        for property in &decl.properties {
            match property.node.key.node.as_str() {
                "width" => width = Some(property.node.value),
                "height" => height = Some(property.node.value),
                other => {
                    return Err(ScriptError::UnknownProperty {
                        key: other.to_string(),
                        span: property.node.key.span.clone(),
                    })
                }
            }
        }

        let name = decl.name.node.as_str();
        match &decl.parent {
            Some(parent) => {
                let parent = self.lookup(parent)?;
                let view = self.installer.platform_mut().add_view(name, parent);
                let sizes = width
                    .map(Attribute::width)
                    .into_iter()
                    .chain(height.map(Attribute::height));
                self.installer.install(view, sizes);
            }
            None if width.is_none() && height.is_none() => {
                self.installer.platform_mut().add_detached(name);
            }
            None => {
                let (default_width, default_height) = self.installer.config().default_root_size;
                self.installer.platform_mut().add_root(
                    name,
                    width.unwrap_or(default_width),
                    height.unwrap_or(default_height),
                );
            }
        }
        Ok(())
    }

    /// Expand one attribute literal and apply its modifiers to every piece.
    fn build(&self, expr: &AttributeExpr) -> Result<Vec<Attribute>, ScriptError> {
        let built = match &expr.head.node {
            AttributeHead::Single { kind, constant } => {
                let attribute = Attribute::new(*kind, constant.constant)
                    .multiplied_by(constant.multiplier);
                match constant.relation {
                    Relation::Equal => vec![attribute],
                    Relation::GreaterOrEqual => vec![attribute.at_least()],
                    Relation::LessOrEqual => vec![attribute.at_most()],
                }
            }
            AttributeHead::Size { width, height } => attribute::size(*width, *height),
            AttributeHead::Edges(inset) => attribute::edges(*inset),
            AttributeHead::Center(offset) => attribute::center(*offset),
        };

        for modifier in &expr.modifiers {
            match &modifier.node {
                Modifier::To { view, kind } => {
                    let target = self.lookup(view)?;
                    match kind {
                        Some(kind) => built.to_attribute(target, *kind),
                        None => built.to(target),
                    };
                }
                Modifier::With(priority) => {
                    built.with(*priority);
                }
                Modifier::When { flag, negated } => {
                    let cell = self.lookup_flag(flag)?;
                    let negated = *negated;
                    built.when(move || cell.get() != negated);
                }
            }
        }
        Ok(built)
    }

    fn lookup(&self, name: &Spanned<Identifier>) -> Result<ViewId, ScriptError> {
        self.view(name.node.as_str()).ok_or_else(|| {
            let scene = self.scene();
            let known: Vec<&str> = scene.views().filter_map(|v| scene.name(v)).collect();
            ScriptError::UndefinedView {
                name: name.node.to_string(),
                span: name.span.clone(),
                suggestions: find_similar(known, name.node.as_str(), 2),
            }
        })
    }

    fn lookup_flag(&self, name: &Spanned<Identifier>) -> Result<Rc<Cell<bool>>, ScriptError> {
        self.flags.get(name.node.as_str()).cloned().ok_or_else(|| ScriptError::UndefinedFlag {
            name: name.node.to_string(),
            span: name.span.clone(),
            suggestions: find_similar(self.flags.keys().map(String::as_str), name.node.as_str(), 2),
        })
    }

    /// Solved frames, rounded to the configured precision.
    pub fn frames(&self) -> Frames {
        self.scene()
            .solve()
            .rounded(self.installer.config().precision)
    }

    /// Registry listing: each view followed by the attributes it holds and
    /// who declared them.
    pub fn attributes_report(&self) -> String {
        AttributeListing(self).to_string()
    }
}

struct AttributeListing<'a>(&'a Session);

impl fmt::Display for AttributeListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scene = self.0.scene();
        for view in scene.views() {
            let entries = self.0.installer.entries(view);
            if entries.is_empty() {
                continue;
            }
            writeln!(f, "{}", scene.name(view).unwrap_or_default())?;
            for entry in entries {
                let owner = scene.name(entry.owner()).unwrap_or_default();
                writeln!(f, "  {}: {}", owner, describe(scene, &entry.attribute))?;
            }
        }
        Ok(())
    }
}

/// Attribute text with view ids replaced by names.
fn describe(scene: &Scene, attribute: &Attribute) -> String {
    let text = attribute.to_string();
    match attribute.target() {
        Some(target) => match scene.name(target.view) {
            Some(name) => text.replace(&target.view.to_string(), name),
            None => text,
        },
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::platform::ViewHierarchy;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<Session, ScriptError> {
        let script = parse(source).expect("Should parse");
        let mut session = Session::new(LayoutConfig::default());
        session.execute(&script)?;
        Ok(session)
    }

    #[test]
    fn test_views_and_sizes() {
        let session = run(
            r#"
            view root [width: 400, height: 1000]
            view a in root [width: 120]
            view loose
            "#,
        )
        .unwrap();
        let root = session.view("root").unwrap();
        let a = session.view("a").unwrap();
        let loose = session.view("loose").unwrap();
        assert_eq!(session.scene().container_of(a), Some(root));
        assert_eq!(session.scene().container_of(loose), None);
        assert_eq!(session.frames().get(a).map(|f| f.width), Some(120.0));
    }

    #[test]
    fn test_root_size_defaults_from_config() {
        let session = run("view root [width: 100]").unwrap();
        let frame = session.frames().by_name("root").unwrap();
        assert_eq!((frame.width, frame.height), (100.0, 480.0));
    }

    #[test]
    fn test_undefined_view_suggests() {
        let err = run("view root [width: 10, height: 10]\nrot <- width(5)")
            .err()
            .unwrap();
        match err {
            ScriptError::UndefinedView {
                name, suggestions, ..
            } => {
                assert_eq!(name, "rot");
                assert_eq!(suggestions, vec!["root".to_string()]);
            }
            other => panic!("Expected UndefinedView, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_view() {
        let err = run("view a\nview a").err().unwrap();
        assert_eq!(
            err,
            ScriptError::DuplicateView {
                name: "a".to_string(),
                span: 12..13
            }
        );
    }

    #[test]
    fn test_flags_drive_conditions() {
        let mut session = run(
            r#"
            view root [width: 400, height: 400]
            view a in root
            flag wide = false
            a <- width(300).when(wide)
            "#,
        )
        .unwrap();
        let a = session.view("a").unwrap();
        assert_eq!(session.installer().attributes(a).len(), 1);
        assert_eq!(session.frames().by_name("a").map(|f| f.width), Some(0.0));

        let toggle = parse("set wide = true\nreload a").unwrap();
        session.execute(&toggle).unwrap();
        assert_eq!(session.flag("wide"), Some(true));
        assert_eq!(session.frames().by_name("a").map(|f| f.width), Some(300.0));
    }

    #[test]
    fn test_undefined_flag() {
        let err = run("view a\na <- width(1).when(wid)").err().unwrap();
        assert!(matches!(err, ScriptError::UndefinedFlag { ref name, .. } if name == "wid"));
    }

    #[test]
    fn test_unknown_property() {
        let err = run("view a [depth: 3]").err().unwrap();
        assert!(matches!(err, ScriptError::UnknownProperty { ref key, .. } if key == "depth"));
    }

    #[test]
    fn test_attach_cycle_is_reported() {
        let err = run("view root [width: 10, height: 10]\nview a in root\nattach root to a")
            .err()
            .unwrap();
        assert!(matches!(err, ScriptError::Scene { source: SceneError::Cycle { .. }, .. }));
    }

    #[test]
    fn test_attributes_report() {
        let session = run(
            r#"
            view root [width: 400, height: 1000]
            view a in root
            view b in root
            a <- [top(20), width(120)]
            b <- top(>= 10).to(a, bottom).with(high)
            "#,
        )
        .unwrap();
        insta::assert_snapshot!(session.attributes_report().trim_end(), @r"
        root
          a: top(20)
          b: top(>= 10).to(a, bottom).with(high)
        a
          a: width(120)
        ");
    }

    #[test]
    fn test_compound_head_modifiers_reach_every_piece() {
        let session = run(
            r#"
            view root [width: 400, height: 400]
            view card in root
            view badge in card
            card <- [top(40), left(40), size(200, 100)]
            badge <- edges(8).to(card).with(high)
            "#,
        )
        .unwrap();
        let badge = session.frames().by_name("badge").unwrap();
        assert_eq!((badge.x, badge.y, badge.width, badge.height), (48.0, 48.0, 184.0, 84.0));
    }

    #[test]
    fn test_attributes_report_after_detach() {
        let session = run(
            r#"
            view root [width: 400, height: 400]
            view a in root
            a <- [top(20), width(120)]
            detach a
            "#,
        )
        .unwrap();
        insta::assert_snapshot!(session.attributes_report().trim_end(), @r"
        a
          a: width(120)
          a: top(20)
        ");
    }
}
