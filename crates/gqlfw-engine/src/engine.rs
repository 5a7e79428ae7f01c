use std::collections::hash_map::Entry;
use std::sync::Arc;

use gqlfw_reduce::Operation;
use gqlfw_reduce::ReduceError;
use gqlfw_reduce::Reducer;
use gqlfw_schema::Schema;
use gqlfw_template as template;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::checker::Checker;
use crate::checker::Context;
use crate::checker::Predicate;
use crate::checker::Scope;
use crate::error::LoadError;
use crate::matcher::MatchState;
use crate::matcher::Matcher;
use crate::path::PathHash;
use crate::scan::scan_template;
use crate::scan::RequestScanner;
use crate::scan::ValueRef;

fn enabled() -> bool {
    true
}

/// A template as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateDefinition {
    pub id: String,
    pub document: template::Operation,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Template text, kept for diagnostics.
    #[serde(default)]
    pub source: Option<String>,
}

impl TemplateDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, document: template::Operation) -> Self {
        Self {
            id: id.into(),
            document,
            enabled: true,
            source: None,
        }
    }
}

/// A compiled template.
#[derive(Debug)]
pub struct Template {
    id: String,
    document: template::Operation,
    source: Option<String>,
    paths: Vec<String>,
    predicates: Vec<Predicate>,
}

impl Template {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn document(&self) -> &template::Operation {
        &self.document
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Structural leaf paths required by the template.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether every constrained argument accepts every value it was
    /// given in the request.
    fn accepts(
        &self,
        checker: &mut Checker,
        context: &Context<'_>,
        arguments: &[(PathHash, ValueRef)],
    ) -> bool {
        self.predicates.iter().all(|predicate| {
            arguments
                .iter()
                .filter(|(hash, _)| *hash == predicate.path())
                .all(|&(_, position)| checker.check(context, predicate, position))
        })
    }
}

#[derive(Debug)]
struct Compiled {
    templates: Vec<Template>,
    matcher: Matcher,
    argument_paths: FxHashSet<PathHash>,
    variable_paths: FxHashSet<PathHash>,
    schema: Option<Schema>,
}

/// Path text by hash, across the whole template set.
#[derive(Default)]
struct PathTable {
    texts: FxHashMap<PathHash, String>,
}

impl PathTable {
    fn claim(&mut self, hash: PathHash, path: &str) -> Result<(), LoadError> {
        match self.texts.entry(hash) {
            Entry::Occupied(entry) if entry.get() != path => Err(LoadError::PathHashCollision {
                first: entry.get().clone(),
                second: path.to_string(),
            }),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(path.to_string());
                Ok(())
            }
        }
    }
}

impl Compiled {
    fn new(
        definitions: impl IntoIterator<Item = TemplateDefinition>,
        schema: Option<Schema>,
    ) -> Result<Self, LoadError> {
        if let Some(schema) = &schema {
            schema.validate()?;
        }

        let mut compiled = Compiled {
            templates: Vec::new(),
            matcher: Matcher::default(),
            argument_paths: FxHashSet::default(),
            variable_paths: FxHashSet::default(),
            schema: None,
        };
        let mut ids = FxHashSet::default();
        let mut table = PathTable::default();

        for definition in definitions {
            if !ids.insert(definition.id.clone()) {
                return Err(LoadError::DuplicateTemplate(definition.id));
            }
            if !definition.enabled {
                tracing::warn!(template = %definition.id, "skipping disabled template");
                continue;
            }
            let template = compiled.add(definition, schema.as_ref(), &mut table)?;
            compiled.templates.push(template);
        }

        compiled.schema = schema;
        tracing::debug!(
            templates = compiled.templates.len(),
            paths = table.texts.len(),
            typed = compiled.schema.is_some(),
            "compiled template set"
        );
        Ok(compiled)
    }

    fn add(
        &mut self,
        definition: TemplateDefinition,
        schema: Option<&Schema>,
        table: &mut PathTable,
    ) -> Result<Template, LoadError> {
        let id = definition.id.as_str();
        let (paths, predicates) = {
            let scanned = scan_template(id, &definition.document, schema)?;
            for leaf in &scanned.leaves {
                table.claim(leaf.hash, &leaf.path)?;
            }
            for argument in &scanned.arguments {
                table.claim(argument.hash, &argument.path)?;
            }
            for variable in &scanned.variables {
                table.claim(variable.hash, &variable.path)?;
            }

            let scope: Scope<'_> = scanned
                .variables
                .iter()
                .map(|variable| (variable.name, variable.hash))
                .collect();
            let predicates = scanned
                .arguments
                .iter()
                .filter_map(|argument| Predicate::compile(id, argument, &scope).transpose())
                .collect::<Result<Vec<_>, _>>()?;

            self.matcher.register(&scanned);
            self.argument_paths
                .extend(scanned.arguments.iter().map(|argument| argument.hash));
            self.variable_paths
                .extend(scanned.variables.iter().map(|variable| variable.hash));

            tracing::debug!(
                template = id,
                leaves = scanned.leaves.len(),
                arguments = scanned.arguments.len(),
                predicates = predicates.len(),
                max_sets = scanned.combinators.len(),
                "compiled template"
            );
            let paths = scanned.leaves.into_iter().map(|leaf| leaf.path).collect();
            (paths, predicates)
        };

        Ok(Template {
            id: definition.id,
            document: definition.document,
            source: definition.source,
            paths,
            predicates,
        })
    }
}

/// Matches requests against a compiled template set.
///
/// The template set is shared; every other part of an engine is scratch
/// space reused between requests. Use [`Engine::instance`] to get one
/// engine per worker.
#[derive(Debug)]
pub struct Engine {
    compiled: Arc<Compiled>,
    reducer: Reducer,
    scanner: RequestScanner,
    state: MatchState,
    checker: Checker,
}

impl Engine {
    /// Compiles `definitions` into a template set. Any error makes the
    /// whole set unusable.
    pub fn new(
        definitions: impl IntoIterator<Item = TemplateDefinition>,
        schema: Option<Schema>,
    ) -> Result<Self, LoadError> {
        let compiled = Compiled::new(definitions, schema)?;
        Ok(Self::with_compiled(Arc::new(compiled)))
    }

    fn with_compiled(compiled: Arc<Compiled>) -> Self {
        Self {
            compiled,
            reducer: Reducer::new(),
            scanner: RequestScanner::default(),
            state: MatchState::default(),
            checker: Checker::default(),
        }
    }

    /// Another engine over the same template set, with its own scratch
    /// state.
    #[must_use]
    pub fn instance(&self) -> Self {
        Self::with_compiled(Arc::clone(&self.compiled))
    }

    #[must_use]
    pub fn templates(&self) -> &[Template] {
        &self.compiled.templates
    }

    #[must_use]
    pub fn schema(&self) -> Option<&Schema> {
        self.compiled.schema.as_ref()
    }

    /// Matches one request and reports the first matching template.
    ///
    /// `on_operation` sees the reduced operation before matching.
    /// `on_match` receives `None` when no template matches; `on_error` is
    /// called instead of both when the request cannot be reduced.
    pub fn match_request<O, M, E>(
        &mut self,
        body: &str,
        operation_name: Option<&str>,
        variables: Option<&str>,
        on_operation: O,
        on_match: M,
        on_error: E,
    ) where
        O: FnOnce(&Operation<'_>),
        M: FnOnce(Option<&Template>),
        E: FnOnce(ReduceError),
    {
        let mut first = None;
        let reduced = self.run(body, operation_name, variables, on_operation, |template| {
            first = Some(template);
            false
        });
        match reduced {
            Ok(()) => on_match(first),
            Err(err) => on_error(err),
        }
    }

    /// Like [`Engine::match_request`], but calls `on_match` for every
    /// matching template, in registration order.
    ///
    /// Returns the number of matching templates. When no template matches,
    /// `on_match` is never called and the result is 0; it is also 0 when
    /// `on_error` was called.
    pub fn match_all<O, M, E>(
        &mut self,
        body: &str,
        operation_name: Option<&str>,
        variables: Option<&str>,
        on_operation: O,
        mut on_match: M,
        on_error: E,
    ) -> usize
    where
        O: FnOnce(&Operation<'_>),
        M: FnMut(&Template),
        E: FnOnce(ReduceError),
    {
        let mut count = 0;
        let reduced = self.run(body, operation_name, variables, on_operation, |template| {
            count += 1;
            on_match(template);
            true
        });
        if let Err(err) = reduced {
            on_error(err);
        }
        count
    }

    /// Runs one request and feeds matching templates to `matched` until it
    /// returns `false`.
    fn run<'e, O, F>(
        &'e mut self,
        body: &str,
        operation_name: Option<&str>,
        variables: Option<&str>,
        on_operation: O,
        mut matched: F,
    ) -> Result<(), ReduceError>
    where
        O: FnOnce(&Operation<'_>),
        F: FnMut(&'e Template) -> bool,
    {
        let Engine {
            compiled,
            reducer,
            scanner,
            state,
            checker,
        } = self;
        let compiled: &'e Compiled = compiled;

        let operation = reducer.reduce(body, operation_name, variables).map_err(|err| {
            tracing::debug!(error = %err, "request rejected by the reducer");
            err
        })?;
        on_operation(&operation);

        let paths = scanner.scan(&operation, &compiled.variable_paths);
        if paths
            .arguments
            .iter()
            .any(|(hash, _)| !compiled.argument_paths.contains(hash))
        {
            tracing::trace!("argument unknown to every template");
            return Ok(());
        }

        let context = Context {
            operation,
            observed: paths.variables,
            schema: compiled.schema.as_ref(),
        };
        for &candidate in compiled.matcher.find(paths.leaves, state) {
            let template = &compiled.templates[candidate];
            if !template.accepts(checker, &context, paths.arguments) {
                tracing::trace!(template = %template.id, "argument constraints rejected the request");
                continue;
            }
            tracing::trace!(template = %template.id, "template matched");
            if !matched(template) {
                break;
            }
        }
        Ok(())
    }
}
