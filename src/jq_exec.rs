//! jq pre-selection: one compiled filter, applied to every loaded document.
use anyhow::{anyhow, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;

type Filter = jaq_core::Filter<Native<Val>>;

/// A compiled jq program whose outputs are the instances to validate.
pub struct JqSelector {
    filter: Filter,
}

impl JqSelector {
    pub fn compile(filter_src: &str) -> Result<Self> {
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = load::Arena::default();
        let modules = loader
            .load(&arena, load::File { code: filter_src, path: () })
            .map_err(parse_failure)?;
        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(undefined_names)?;
        tracing::debug!(filter = filter_src, "jq filter compiled");
        Ok(Self { filter })
    }

    /// Every output of the filter on `document`, in emission order.
    pub fn select(&self, document: &Value) -> Result<Vec<Value>> {
        let inputs = RcIter::new(core::iter::empty());
        self.filter
            .run((Ctx::new([], &inputs), Val::from(document.clone())))
            .map(|item| {
                item.map(Value::from)
                    .map_err(|err| anyhow!("jq runtime error: {err:?}"))
            })
            .collect()
    }
}

fn parse_failure(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("cannot parse jq filter `{}`: {err:?}", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn undefined_names(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let names: Vec<String> = errs
        .into_iter()
        .flat_map(|(_, list)| list.into_iter().map(|(name, undef)| format!("`{name}` ({undef:?})")))
        .collect();
    anyhow!("jq filter uses undefined names: {}", names.join(", "))
}
