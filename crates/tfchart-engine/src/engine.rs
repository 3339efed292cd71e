//! Template engine based on MiniJinja

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tfchart_core::{Chart, ChartMetadata, TemplateUnit, Values, output};

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;

/// What happened to one template during a render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "path", rename_all = "lowercase")]
pub enum RenderOutcome {
    /// Enabled; the output file was (re)written
    Written(PathBuf),
    /// Disabled; a previously rendered output was deleted
    Removed(PathBuf),
    /// Disabled; there was nothing to delete
    Skipped(PathBuf),
}

impl RenderOutcome {
    /// The output path this outcome refers to
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(p) | Self::Removed(p) | Self::Skipped(p) => p,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Written(_) => "written",
            Self::Removed(_) => "removed",
            Self::Skipped(_) => "skipped",
        }
    }
}

/// Per-template outcomes of a chart render, in processing order
#[derive(Debug, Default, Clone, Serialize)]
pub struct RenderReport {
    pub chart: String,
    pub outcomes: Vec<(String, RenderOutcome)>,
}

impl RenderReport {
    fn count(&self, pred: fn(&RenderOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, RenderOutcome::Written(_)))
    }

    pub fn removed(&self) -> usize {
        self.count(|o| matches!(o, RenderOutcome::Removed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RenderOutcome::Skipped(_)))
    }

    /// Outcome of a template by file name
    pub fn outcome(&self, template: &str) -> Option<&RenderOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == template)
            .map(|(_, o)| o)
    }

    /// "2 written, 1 removed, 0 skipped"
    pub fn summary(&self) -> String {
        format!(
            "{} written, {} removed, {} skipped",
            self.written(),
            self.removed(),
            self.skipped()
        )
    }
}

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
///
/// Holds configuration only. Every render builds a fresh MiniJinja
/// environment, so one engine can serve concurrent renders.
#[derive(Debug, Clone)]
pub struct Engine {
    strict_mode: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Engine {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn is_strict(&self) -> bool {
        self.strict_mode
    }

    /// Create a configured MiniJinja environment
    ///
    /// `templates` are served through the loader, so any of them can be
    /// included or imported by another regardless of render order.
    fn create_environment(&self, templates: &[TemplateUnit]) -> Environment<'static> {
        let mut env = Environment::new();

        let sources: BTreeMap<String, String> = templates
            .iter()
            .map(|t| (t.name.clone(), t.content.clone()))
            .collect();
        env.set_loader(move |name| Ok(sources.get(name).cloned()));

        env.set_undefined_behavior(if self.strict_mode {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });
        env.set_keep_trailing_newline(true);

        // Filters
        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("tojson_pretty", filters::tojson_pretty);
        env.add_filter("tohcl", filters::tohcl);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("empty", filters::empty);
        env.add_filter("haskey", filters::haskey);
        env.add_filter("keys", filters::keys);
        env.add_filter("merge", filters::merge);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("sha1", filters::sha1sum);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);
        env.add_filter("snakecase", filters::snakecase);
        env.add_filter("kebabcase", filters::kebabcase);
        env.add_filter("camelcase", filters::camelcase);
        env.add_filter("tostrings", filters::tostrings);
        env.add_filter("regex_match", filters::regex_match);
        env.add_filter("regex_replace", filters::regex_replace);
        env.add_filter("toint", filters::toint);
        env.add_filter("tofloat", filters::tofloat);

        // Global functions
        env.add_function("fail", functions::fail);
        env.add_function("dict", functions::dict);
        env.add_function("list", functions::list);
        env.add_function("get", functions::get);
        env.add_function("set", functions::set);
        env.add_function("unset", functions::unset);
        env.add_function("dig", functions::dig);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);
        env.add_function("tostring", functions::tostring);
        env.add_function("toint", filters::toint);
        env.add_function("tofloat", filters::tofloat);
        env.add_function("now", functions::now);
        env.add_function("printf", functions::printf);
        env.add_function("tpl", functions::tpl);

        env
    }

    /// Render one template unit into `output_dir`
    ///
    /// The `chart` global is not available here since no chart is attached;
    /// use [`Engine::render_chart`] for that.
    pub fn render_template(
        &self,
        template: &TemplateUnit,
        values: &Values,
        output_dir: &Path,
    ) -> Result<RenderOutcome> {
        let env = self.create_environment(std::slice::from_ref(template));
        self.render_unit(&env, None, template, values, output_dir)
    }

    /// Render every template of a chart into `output_dir`
    ///
    /// The chart is validated first and nothing is touched on disk if that
    /// fails. Templates are then processed in order; the first error stops
    /// the render, leaving files written by earlier templates in place.
    /// `output_dir` exists afterwards even when every template is disabled.
    pub fn render_chart(&self, chart: &Chart, output_dir: &Path) -> Result<RenderReport> {
        chart.validate()?;
        output::ensure_dir(output_dir)?;

        let env = self.create_environment(&chart.templates);
        let mut report = RenderReport {
            chart: chart.metadata.name.clone(),
            outcomes: Vec::with_capacity(chart.templates.len()),
        };

        for template in &chart.templates {
            let outcome = self.render_unit(
                &env,
                Some(&chart.metadata),
                template,
                &chart.values,
                output_dir,
            )?;
            report.outcomes.push((template.name.clone(), outcome));
        }

        Ok(report)
    }

    /// Parse a template without rendering it
    pub fn check_syntax(&self, template: &TemplateUnit) -> Result<()> {
        let mut env = self.create_environment(&[]);
        env.add_template_owned(template.name.clone(), template.content.clone())
            .map_err(|e| syntax_error(&e, template))
    }

    /// Render a template source to a string against a values document
    pub fn render_string(
        &self,
        source: &str,
        template_name: &str,
        values: &Values,
        chart: Option<&ChartMetadata>,
    ) -> Result<String> {
        let unit = TemplateUnit::new(template_name, source);
        let env = self.create_environment(std::slice::from_ref(&unit));
        self.execute(&env, chart, &unit, values)
    }

    fn render_unit(
        &self,
        env: &Environment<'static>,
        chart: Option<&ChartMetadata>,
        template: &TemplateUnit,
        values: &Values,
        output_dir: &Path,
    ) -> Result<RenderOutcome> {
        let output_path = output_dir.join(&template.relative_path);

        if !values.contains_key(template.enablement_key()) {
            return Ok(if output::remove_if_exists(&output_path)? {
                RenderOutcome::Removed(output_path)
            } else {
                RenderOutcome::Skipped(output_path)
            });
        }

        let rendered = self.execute(env, chart, template, values)?;

        if let Some(parent) = output_path.parent() {
            output::ensure_dir(parent)?;
        }
        output::write_file(&output_path, rendered.as_bytes())?;

        Ok(RenderOutcome::Written(output_path))
    }

    fn execute(
        &self,
        env: &Environment<'static>,
        chart: Option<&ChartMetadata>,
        template: &TemplateUnit,
        values: &Values,
    ) -> Result<String> {
        let tmpl = env
            .get_template(&template.name)
            .map_err(|e| syntax_error(&e, template))?;

        let ctx = build_context(chart, template, values);

        tmpl.render(ctx).map_err(|e| EngineError::TemplateExecution {
            template: template.name.clone(),
            error: Box::new(TemplateError::from_minijinja(
                &e,
                &template.name,
                &template.content,
                Some(values.inner()),
            )),
        })
    }
}

fn syntax_error(err: &minijinja::Error, template: &TemplateUnit) -> EngineError {
    EngineError::TemplateSyntax {
        template: template.name.clone(),
        error: Box::new(TemplateError::from_minijinja(
            err,
            &template.name,
            &template.content,
            None,
        )),
    }
}

/// Build the render context
///
/// Every top-level values key is a variable. `chart` and `template` are
/// injected underneath so a values key of the same name wins, and the whole
/// document is reachable as `values` unless it defines that key itself.
fn build_context(
    chart: Option<&ChartMetadata>,
    template: &TemplateUnit,
    values: &Values,
) -> Value {
    let mut ctx = Map::new();

    if let Some(meta) = chart {
        ctx.insert(
            "chart".to_string(),
            serde_json::json!({
                "name": meta.name,
                "version": meta.version,
                "type": meta.chart_type,
                "description": meta.description,
            }),
        );
    }
    ctx.insert(
        "template".to_string(),
        serde_json::json!({
            "name": template.name,
            "key": template.enablement_key(),
        }),
    );

    if let JsonValue::Object(map) = values.inner() {
        for (key, value) in map {
            ctx.insert(key.clone(), value.clone());
        }
    }

    if !values.contains_key("values") {
        ctx.insert("values".to_string(), values.inner().clone());
    }

    Value::from_serialize(JsonValue::Object(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RenderPhase, TemplateErrorKind};
    use std::fs;
    use tempfile::TempDir;

    fn chart(templates: &[(&str, &str)], values: &str) -> Chart {
        let metadata = ChartMetadata {
            name: "aws-vpc".to_string(),
            version: "1.0.0".to_string(),
            chart_type: "aws".to_string(),
            description: Some("VPC".to_string()),
            ..Default::default()
        };
        let templates = templates
            .iter()
            .map(|(name, body)| TemplateUnit::new(*name, *body))
            .collect();
        Chart::new(metadata, templates).with_values(Values::from_yaml(values).unwrap())
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    fn render(source: &str, values: &str) -> String {
        Engine::default()
            .render_string(source, "test.tf", &Values::from_yaml(values).unwrap(), None)
            .unwrap()
    }

    #[test]
    fn test_builder_strictness() {
        assert!(Engine::default().is_strict());
        assert!(Engine::builder().build().is_strict());
        assert!(!Engine::builder().strict(false).build().is_strict());
    }

    #[test]
    fn test_example_scenario() {
        let out = TempDir::new().unwrap();
        let chart = chart(
            &[
                ("network.tf", "cidr_block = \"{{ network.cidr }}\"\n"),
                ("compute.tf", "compute = {{ compute | tohcl }}\n"),
                ("storage.tf", "bucket = \"{{ storage.bucket }}\"\n"),
            ],
            "network:\n  cidr: 10.0.0.0/16\ncompute: null\n",
        );

        let report = Engine::default().render_chart(&chart, out.path()).unwrap();

        assert_eq!(read(&out, "network.tf"), "cidr_block = \"10.0.0.0/16\"\n");
        assert_eq!(read(&out, "compute.tf"), "compute = null\n");
        assert!(!out.path().join("storage.tf").exists());
        assert_eq!(
            report.outcome("storage.tf"),
            Some(&RenderOutcome::Skipped(out.path().join("storage.tf")))
        );
        assert_eq!(report.summary(), "2 written, 0 removed, 1 skipped");
    }

    #[test]
    fn test_enablement_is_presence_based() {
        let out = TempDir::new().unwrap();
        let chart = chart(
            &[
                ("dns.tf", "# dns {{ dns }}"),
                ("nat.tf", "# nat"),
                ("vpn.tf", "# vpn"),
            ],
            "dns: false\nnat: {}\n",
        );

        let report = Engine::default().render_chart(&chart, out.path()).unwrap();

        assert_eq!(read(&out, "dns.tf"), "# dns false");
        assert_eq!(read(&out, "nat.tf"), "# nat");
        assert!(matches!(report.outcome("vpn.tf"), Some(RenderOutcome::Skipped(_))));
    }

    #[test]
    fn test_render_is_idempotent() {
        let out = TempDir::new().unwrap();
        let chart = chart(
            &[("network.tf", "{% for s in network.subnets %}subnet \"{{ s }}\"\n{% endfor %}")],
            "network:\n  subnets: [a, b]\n",
        );
        let engine = Engine::default();

        engine.render_chart(&chart, out.path()).unwrap();
        let first = fs::read(out.path().join("network.tf")).unwrap();
        engine.render_chart(&chart, out.path()).unwrap();
        let second = fs::read(out.path().join("network.tf")).unwrap();

        assert_eq!(first, second);
        assert_eq!(String::from_utf8(second).unwrap(), "subnet \"a\"\nsubnet \"b\"\n");
    }

    #[test]
    fn test_disabled_template_output_is_removed() {
        let out = TempDir::new().unwrap();
        let templates = [("network.tf", "# network"), ("storage.tf", "# storage")];
        let engine = Engine::default();

        engine
            .render_chart(&chart(&templates, "network: {}\nstorage: {}\n"), out.path())
            .unwrap();
        assert!(out.path().join("storage.tf").exists());
        fs::write(out.path().join("foreign.txt"), "keep me").unwrap();

        let report = engine
            .render_chart(&chart(&templates, "network: {}\n"), out.path())
            .unwrap();

        assert!(!out.path().join("storage.tf").exists());
        assert!(matches!(report.outcome("storage.tf"), Some(RenderOutcome::Removed(_))));
        assert_eq!(read(&out, "foreign.txt"), "keep me");

        let report = engine
            .render_chart(&chart(&templates, "network: {}\n"), out.path())
            .unwrap();
        assert!(matches!(report.outcome("storage.tf"), Some(RenderOutcome::Skipped(_))));
    }

    #[test]
    fn test_full_document_visibility() {
        let out = TempDir::new().unwrap();
        let chart = chart(
            &[(
                "compute.tf",
                "subnet = \"{{ network.cidr }}\"\ncount = {{ values.compute.count }}",
            )],
            "network:\n  cidr: 10.0.1.0/24\ncompute:\n  count: 2\n",
        );

        Engine::default().render_chart(&chart, out.path()).unwrap();

        assert_eq!(read(&out, "compute.tf"), "subnet = \"10.0.1.0/24\"\ncount = 2");
    }

    #[test]
    fn test_fail_fast_reports_later_syntax_error() {
        let out = TempDir::new().unwrap();
        let chart = chart(
            &[("a.tf", "# ok"), ("b.tf", "{% if a %}"), ("c.tf", "# never")],
            "a: 1\nb: 1\nc: 1\n",
        );

        let err = Engine::default().render_chart(&chart, out.path()).unwrap_err();

        assert_eq!(err.phase(), RenderPhase::TemplateSyntax);
        assert_eq!(err.template(), Some("b.tf"));
        assert_eq!(
            err.template_error().map(|e| e.kind()),
            Some(TemplateErrorKind::SyntaxError)
        );
        assert!(out.path().join("a.tf").exists());
        assert!(!out.path().join("b.tf").exists());
        assert!(!out.path().join("c.tf").exists());
    }

    #[test]
    fn test_output_dir_created_when_all_disabled() {
        let out = TempDir::new().unwrap();
        let target = out.path().join("rendered");
        let chart = chart(&[("storage.tf", "# storage")], "network: {}\n");

        let report = Engine::default().render_chart(&chart, &target).unwrap();

        assert_eq!(report.summary(), "0 written, 0 removed, 1 skipped");
        assert!(target.is_dir());
    }

    #[test]
    fn test_include_does_not_depend_on_order() {
        let out = TempDir::new().unwrap();
        let chart = chart(
            &[
                ("a.tf", "{% include 'b.tf' %}# a\n"),
                ("b.tf", "# b\n"),
                ("c.tf", "{% include 'locals.tf' %}"),
                ("locals.tf", "locals { region = {{ region | tohcl }} }\n"),
            ],
            "a: {}\nb: {}\nc: {}\nregion: eu-west-1\n",
        );

        let report = Engine::default().render_chart(&chart, out.path()).unwrap();

        assert_eq!(read(&out, "a.tf"), "# b\n# a\n");
        assert_eq!(read(&out, "c.tf"), "locals { region = \"eu-west-1\" }\n");
        // locals.tf is disabled on its own but still includable
        assert!(matches!(report.outcome("locals.tf"), Some(RenderOutcome::Skipped(_))));
    }

    #[test]
    fn test_validation_gate_blocks_writes() {
        let out = TempDir::new().unwrap();
        let target = out.path().join("rendered");

        let err = Engine::default()
            .render_chart(&chart(&[], "network: {}\n"), &target)
            .unwrap_err();
        assert_eq!(err.phase(), RenderPhase::Validation);
        assert_eq!(err.to_string(), "Invalid chart: no templates found in chart");

        let err = Engine::default()
            .render_chart(&chart(&[("network.tf", "x")], ""), &target)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid chart: values document is empty");

        assert!(!target.exists());
    }

    #[test]
    fn test_execution_error_publishes_nothing() {
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("network.tf"), "previous").unwrap();
        let chart = chart(&[("network.tf", "cidr = {{ network.cidrr }}")], "network:\n  cidr: x\n");

        let err = Engine::default().render_chart(&chart, out.path()).unwrap_err();

        assert_eq!(err.phase(), RenderPhase::TemplateExecution);
        assert_eq!(err.template(), Some("network.tf"));
        let diag = err.template_error().unwrap();
        assert_eq!(diag.kind(), TemplateErrorKind::UndefinedVariable);
        assert_eq!(read(&out, "network.tf"), "previous");
    }

    #[test]
    fn test_lenient_mode_renders_undefined_as_empty() {
        let values = Values::from_yaml("network: {}").unwrap();
        let out = Engine::builder()
            .strict(false)
            .build()
            .render_string("cidr = \"{{ network.cidr }}\"", "network.tf", &values, None)
            .unwrap();
        assert_eq!(out, "cidr = \"\"");
    }

    #[test]
    fn test_render_template_creates_output_dir() {
        let out = TempDir::new().unwrap();
        let nested = out.path().join("envs/prod");
        let unit = TemplateUnit::new("network.tf", "# {{ template.key }} from {{ template.name }}");
        let values = Values::from_yaml("network: {}").unwrap();

        let outcome = Engine::default()
            .render_template(&unit, &values, &nested)
            .unwrap();

        assert_eq!(outcome, RenderOutcome::Written(nested.join("network.tf")));
        assert_eq!(outcome.action(), "written");
        assert_eq!(
            fs::read_to_string(nested.join("network.tf")).unwrap(),
            "# network from network.tf"
        );
    }

    #[test]
    fn test_chart_global() {
        let out = TempDir::new().unwrap();
        let chart = chart(
            &[("main.tf", "# {{ chart.name }} {{ chart.version }} ({{ chart.type }})")],
            "main: {}\n",
        );

        Engine::default().render_chart(&chart, out.path()).unwrap();

        assert_eq!(read(&out, "main.tf"), "# aws-vpc 1.0.0 (aws)");
    }

    #[test]
    fn test_values_key_shadows_alias_and_globals() {
        assert_eq!(render("{{ values }}-{{ chart }}", "values: mine\nchart: x\n"), "mine-x");
    }

    #[test]
    fn test_terraform_interpolation_passes_through() {
        let source = "name = \"${var.prefix}-{{ network.name }}\"";
        assert_eq!(render(source, "network:\n  name: vpc\n"), "name = \"${var.prefix}-vpc\"");
    }

    #[test]
    fn test_filters_and_functions_registered() {
        let out = render(
            r#"tags = {{ dict("Name", network.name | kebabcase, "Env", "prod") | tohcl }}
cidrs = {{ network.subnets | tohcl }}
count = {{ coalesce(none, network.count) }}
region = {{ network.region | default("us-east-1") | quote }}"#,
            "network:\n  name: MainVpc\n  subnets: [10.0.1.0/24]\n  count: 3\n",
        );
        insta::assert_snapshot!(out, @r#"
        tags = { Env = "prod", Name = "main-vpc" }
        cidrs = ["10.0.1.0/24"]
        count = 3
        region = "us-east-1"
        "#);
    }

    #[test]
    fn test_check_syntax() {
        let engine = Engine::default();
        assert!(engine.check_syntax(&TemplateUnit::new("ok.tf", "{{ a }}")).is_ok());

        let err = engine
            .check_syntax(&TemplateUnit::new("bad.tf", "{{ a "))
            .unwrap_err();
        assert_eq!(err.template(), Some("bad.tf"));
        assert_eq!(err.phase(), RenderPhase::TemplateSyntax);
    }

    #[test]
    fn test_report_serializes() {
        let report = RenderReport {
            chart: "aws-vpc".to_string(),
            outcomes: vec![(
                "network.tf".to_string(),
                RenderOutcome::Written(PathBuf::from("out/network.tf")),
            )],
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "chart": "aws-vpc",
                "outcomes": [["network.tf", {"action": "written", "path": "out/network.tf"}]]
            })
        );
    }
}
