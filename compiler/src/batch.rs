//! Batch compilation of many shaders into one shader set file.
//!
//! Work is split into independent jobs, one per program variant of every
//! shader. A job compiles its program variant once and then assembles every
//! variant that only differs in program-invariant options from that result.
//! Each job owns its downstream compiler; the diagnostics list and the output
//! writer are shared behind locks.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use shaderset_shared::{ShaderSetWriter, ShaderVariant, WriterError};

use crate::ast::TranslationUnit;
use crate::config::BuildConfig;
use crate::diagnostics::Diagnostics;
use crate::downstream::DownstreamCompiler;
use crate::options::BitsOptionValueSet;
use crate::shader::ShaderCompiler;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to create shader set {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write shader set")]
    Writer(#[from] WriterError),

    #[error("compilation failed with {errors} error(s)")]
    CompilationFailed { errors: usize, summary: BuildSummary },
}

/// One parsed shader handed to the builder
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub name: String,
    pub source: String,
    pub unit: TranslationUnit,
}

impl ShaderSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>, unit: TranslationUnit) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            unit,
        }
    }
}

/// Counts of one build run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub shaders: usize,
    /// Program variants handed to the downstream compiler, failed ones included
    pub compiled: usize,
    /// Variants stored in the shader set
    pub assembled: usize,
}

type DownstreamFactory = dyn Fn() -> Box<dyn DownstreamCompiler> + Send + Sync;

type FileWriter = ShaderSetWriter<BufWriter<File>>;

pub struct ShaderSetBuilder {
    config: BuildConfig,
    downstream: Box<DownstreamFactory>,
    diagnostics: Diagnostics,
}

impl ShaderSetBuilder {
    /// `downstream` is called once per job to get a compiler owned by that job
    pub fn new<F>(config: BuildConfig, downstream: F) -> Self
    where
        F: Fn() -> Box<dyn DownstreamCompiler> + Send + Sync + 'static,
    {
        Self {
            config,
            downstream: Box::new(downstream),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Everything reported by the last [`build`](Self::build)
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Analyzes and compiles all shaders and writes the configured output file.
    ///
    /// Failing variants don't stop their siblings, but any error diagnostic
    /// fails the build. The output file never survives a failed build.
    pub fn build(&mut self, shaders: Vec<ShaderSource>) -> Result<BuildSummary, BuildError> {
        self.diagnostics.clear();
        let path = self.config.output.clone();
        let result = self.build_to(&path, shaders);
        if result.is_err() && path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove incomplete shader set {}: {}", path.display(), e);
            }
        }
        result
    }

    fn build_to(&mut self, path: &Path, shaders: Vec<ShaderSource>) -> Result<BuildSummary, BuildError> {
        let analyze = |shader: ShaderSource| ShaderCompiler::new(shader.name, shader.source, shader.unit);
        let compilers: Vec<ShaderCompiler> = if self.config.parallel {
            shaders.into_par_iter().map(analyze).collect()
        } else {
            shaders.into_iter().map(analyze).collect()
        };
        for compiler in &compilers {
            self.diagnostics.extend(compiler.diagnostics().iter().cloned());
        }
        // Shaders that failed analysis have no valid variant space to reserve
        let compilers: Vec<&ShaderCompiler> = compilers.iter().filter(|c| !c.has_error()).collect();

        let file = File::create(path).map_err(|source| BuildError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut writer = ShaderSetWriter::new(BufWriter::new(file));
        for compiler in &compilers {
            let source = self.config.embed_source.then(|| compiler.source().to_string());
            let variant_count = compiler.all_variants().len() as u32;
            writer.add_shader(compiler.info().clone(), compiler.name(), source, variant_count)?;
            tracing::debug!("{}: {} variants", compiler.name(), variant_count);
        }

        let jobs: Vec<(&ShaderCompiler, u32)> = compilers
            .iter()
            .flat_map(|&compiler| {
                let groups: Vec<u32> = compiler.program_variants().iter().collect();
                groups.into_iter().map(move |bits| (compiler, bits))
            })
            .collect();
        let shared = SharedOutput {
            writer: Mutex::new(writer),
            diagnostics: Mutex::new(Diagnostics::new()),
            compiled: AtomicUsize::new(0),
            assembled: AtomicUsize::new(0),
        };
        let run = |&(compiler, bits): &(&ShaderCompiler, u32)| self.compile_group(compiler, bits, &shared);
        if self.config.parallel {
            jobs.par_iter().try_for_each(run)?;
        } else {
            jobs.iter().try_for_each(run)?;
        }

        let SharedOutput {
            writer,
            diagnostics,
            compiled,
            assembled,
        } = shared;
        self.diagnostics.append(&mut lock(diagnostics.into_inner()));
        lock(writer.into_inner()).finish()?;

        let summary = BuildSummary {
            shaders: compilers.len(),
            compiled: compiled.into_inner(),
            assembled: assembled.into_inner(),
        };
        tracing::info!(
            "Compiled {} and assembled {} shader variants in total",
            summary.compiled,
            summary.assembled
        );

        let errors = self.diagnostics.error_count();
        if errors > 0 {
            return Err(BuildError::CompilationFailed { errors, summary });
        }
        Ok(summary)
    }

    /// Compiles one program variant and stores it with all its program-invariant siblings
    fn compile_group(&self, compiler: &ShaderCompiler, program_bits: u32, shared: &SharedOutput) -> Result<(), BuildError> {
        let Some(variants) = compiler.create_variant_compiler((self.downstream)()) else {
            return Ok(());
        };
        let mut variants = variants.with_output_generated_source_on_error(self.config.output_generated_source_on_error);
        let options = compiler.unit().options();

        shared.compiled.fetch_add(1, Ordering::Relaxed);
        let base = variants.compile(&BitsOptionValueSet::new(options, program_bits), None);
        let result = match &base {
            Some(base) => {
                shared.write(base).and_then(|()| {
                    compiler
                        .program_invariants_for(program_bits)
                        .iter()
                        .filter(|&bits| bits != program_bits)
                        .try_for_each(|bits| {
                            match variants.compile(&BitsOptionValueSet::new(options, bits), Some(base)) {
                                Some(variant) => shared.write(&variant),
                                None => Ok(()),
                            }
                        })
                })
            }
            None => Ok(()),
        };

        let mut diagnostics = variants.take_diagnostics();
        if !diagnostics.is_empty() {
            lock(shared.diagnostics.lock()).append(&mut diagnostics);
        }
        result
    }
}

struct SharedOutput {
    writer: Mutex<FileWriter>,
    diagnostics: Mutex<Diagnostics>,
    compiled: AtomicUsize,
    assembled: AtomicUsize,
}

impl SharedOutput {
    fn write(&self, variant: &ShaderVariant) -> Result<(), BuildError> {
        lock(self.writer.lock()).write_variant(variant)?;
        self.assembled.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A job that panicked while holding a lock leaves consistent data behind,
/// since every locked section is a single append or write
fn lock<T>(result: Result<T, std::sync::PoisonError<T>>) -> T {
    result.unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Declaration, Expr, PipelineBlock, ShaderStage, StageBlock, Statement, StorageBlock, StorageKind, Type};
    use crate::downstream::{DownstreamOutput, Macro, SourceDownstreamCompiler};
    use crate::diagnostics::DiagnosticCode;
    use shaderset_shared::{FileShaderSet, NumericType, PartialPipelineState, ScalarType, ShaderSet};

    fn unit() -> TranslationUnit {
        let mut unit = TranslationUnit::new();
        unit.add_option("Mode", ["Opaque", "Cutout", "Fade"]);
        unit.add_option("Blend", Vec::<String>::new());
        unit.add_storage_block(StorageBlock::new(StorageKind::Attributes).with(Declaration::new(
            "position",
            Type::Numeric(NumericType::vector(ScalarType::Float, 3)),
        )));
        unit.add_pipeline_block(
            PipelineBlock::new(PartialPipelineState {
                depth_write: Some(false),
                ..PartialPipelineState::default()
            })
            .when(Expr::var("Blend")),
        );
        unit.add_stage_block(StageBlock::new(ShaderStage::Vertex));
        unit.add_stage_block(StageBlock::new(ShaderStage::Fragment).with_statements([Statement::if_else(
            Expr::eq(Expr::var("Mode"), Expr::var("Cutout")),
            Statement::Flow(crate::ast::FlowKind::Discard),
            None,
        )]));
        unit
    }

    fn config(dir: &tempfile::TempDir, parallel: bool) -> BuildConfig {
        BuildConfig {
            parallel,
            embed_source: true,
            ..BuildConfig::default()
        }
        .with_output(dir.path().join("test.shadercache"))
    }

    struct FailFade;

    impl DownstreamCompiler for FailFade {
        fn compile(&mut self, source: &str, stage: ShaderStage, macros: &[Macro]) -> DownstreamOutput {
            if macros.iter().any(|(name, value)| name == "Mode" && value == "2") {
                return DownstreamOutput::failure(Diagnostics::new());
            }
            SourceDownstreamCompiler.compile(source, stage, macros)
        }
    }

    #[test]
    fn test_build_writes_all_variants() {
        for parallel in [true, false] {
            let dir = tempfile::tempdir().unwrap();
            let mut builder = ShaderSetBuilder::new(config(&dir, parallel), || Box::new(SourceDownstreamCompiler));
            let summary = builder
                .build(vec![ShaderSource::new("lit.shader", "lit", unit())])
                .unwrap();
            assert_eq!(
                summary,
                BuildSummary {
                    shaders: 1,
                    compiled: 3,
                    assembled: 6,
                }
            );

            let mut set = FileShaderSet::open(dir.path().join("test.shadercache")).unwrap();
            let info = set.get_shader_info("lit.shader").unwrap().clone();
            assert_eq!(set.source(info.source_hash), Some("lit"));
            let opaque = set.get_variant(info.variant_key_for(&[("Mode".to_string(), 0)].into())).unwrap();
            let blended = set
                .get_variant(info.variant_key_for(&[("Mode".to_string(), 0), ("Blend".to_string(), 1)].into()))
                .unwrap();
            assert_eq!(opaque.fragment_program, blended.fragment_program);
            assert!(opaque.pipeline_state.depth_write);
            assert!(!blended.pipeline_state.depth_write);
        }
    }

    #[test]
    fn test_failed_build_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = ShaderSetBuilder::new(config(&dir, true), || Box::new(FailFade));
        let result = builder.build(vec![ShaderSource::new("lit.shader", "lit", unit())]);
        let Err(BuildError::CompilationFailed { errors, summary }) = result else {
            panic!("expected a compilation failure, got {result:?}");
        };
        assert_eq!(errors, 2);
        // The Fade group still counts as compiled, but none of its variants are stored
        assert_eq!(
            summary,
            BuildSummary {
                shaders: 1,
                compiled: 3,
                assembled: 4,
            }
        );
        assert!(!dir.path().join("test.shadercache").exists());
        // Both failed stages of the Fade variant report, the other groups are unaffected
        let codes: Vec<_> = builder.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            [DiagnosticCode::VariantStart, DiagnosticCode::Downstream, DiagnosticCode::Downstream]
        );
    }

    #[test]
    fn test_analysis_errors_fail_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = unit();
        bad.add_option("Mode", Vec::<String>::new());
        let mut builder = ShaderSetBuilder::new(config(&dir, false), || Box::new(SourceDownstreamCompiler));
        let result = builder.build(vec![
            ShaderSource::new("bad.shader", "bad", bad),
            ShaderSource::new("lit.shader", "lit", unit()),
        ]);
        assert!(matches!(result, Err(BuildError::CompilationFailed { errors: 1, .. })));
        assert!(builder.diagnostics().contains_code(DiagnosticCode::DuplicateOptionName));
        assert!(!dir.path().join("test.shadercache").exists());
    }
}
