//! zkml command-line interface.
//!
//! Drives the whole lifecycle: inspect a graph, compile and calibrate
//! settings, generate an SRS, run setup, produce witnesses and proofs,
//! verify them, fold accumulation-friendly proofs, and export EVM
//! verifier artifacts.

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zkml_aggregate::{
    aggregate, verify_aggregate, AccumulationMode, AggregateProof, AggregateVerifyingKey,
};
use zkml_core::{
    read_auto, short_hex, write_auto, CalibrationTarget, ProofArtifact, ProofMode, RunArgs,
    Settings, TranscriptType,
};
use zkml_evm::{execute, export_aggregate_verifier, export_verifier};
use zkml_graph::{calibrate, forward, GraphFile, InputData, OpGraph, Witness};
use zkml_pfsys::{gen_srs, load_pk, load_vk, mock, prove, save_pk, save_vk, setup, verify, Srs};

#[derive(Parser, Debug)]
#[command(
    name = "zkml",
    about = "zkml proving lifecycle CLI",
    long_about = "zkml proving lifecycle CLI.\n\nCompile computation graphs into quantized circuits, calibrate scales, and produce/verify/aggregate proofs, including EVM verifier artifacts.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Common proving hyper-parameter flags.
#[derive(clap::Args, Debug, Clone, Copy)]
struct RunArgsOpt {
    /// Fixed-point scale (log2 denominator) for quantization
    #[arg(long, default_value_t = 7)]
    scale: u32,

    /// Bit width budget for quantized intermediates
    #[arg(long, default_value_t = 16)]
    bits: u32,

    /// Ceiling on the log2 row count of the circuit
    #[arg(long, default_value_t = 17)]
    logrows: u32,

    /// Calibration tolerance (mean absolute output error)
    #[arg(long, default_value_t = 0.05)]
    tolerance: f64,
}

impl From<RunArgsOpt> for RunArgs {
    fn from(o: RunArgsOpt) -> Self {
        Self {
            scale: o.scale,
            bits: o.bits,
            logrows: o.logrows,
            tolerance: o.tolerance,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the per-node table (op, scale, inputs, dims) of a graph
    Table {
        /// Input graph file (JSON/CBOR)
        #[arg(long)]
        model: PathBuf,

        /// Fixed-point scale used for the scale column
        #[arg(long, default_value_t = 7)]
        scale: u32,
    },

    /// Compile a graph into circuit settings without calibration
    GenSettings {
        /// Input graph file (JSON/CBOR)
        #[arg(long)]
        model: PathBuf,

        /// Output settings path (JSON/CBOR)
        #[arg(long, default_value = "settings.json")]
        out: PathBuf,

        #[command(flatten)]
        args: RunArgsOpt,
    },

    /// Search quantization scales against representative data
    CalibrateSettings {
        /// Input graph file (JSON/CBOR)
        #[arg(long)]
        model: PathBuf,

        /// Representative input data (JSON/CBOR)
        #[arg(long)]
        data: PathBuf,

        /// Calibration objective
        #[arg(long, value_enum, default_value_t = TargetOpt::Resources)]
        target: TargetOpt,

        /// Output settings path (JSON/CBOR)
        #[arg(long, default_value = "settings.json")]
        out: PathBuf,

        #[command(flatten)]
        args: RunArgsOpt,
    },

    /// Generate a structured reference string
    GenSrs {
        /// Log2 row count the SRS must support
        #[arg(long)]
        logrows: u32,

        /// Output SRS path (binary)
        #[arg(long, default_value = "kzg.srs")]
        out: PathBuf,
    },

    /// Run the quantized forward pass and write the witness
    GenWitness {
        /// Input graph file (JSON/CBOR)
        #[arg(long)]
        model: PathBuf,

        /// Settings the circuit was compiled under (JSON/CBOR)
        #[arg(long)]
        settings: PathBuf,

        /// Input data (JSON/CBOR)
        #[arg(long)]
        data: PathBuf,

        /// Output witness path (JSON/CBOR)
        #[arg(long, default_value = "witness.json")]
        out: PathBuf,
    },

    /// Check constraint satisfaction on real data without proving
    Mock {
        /// Input graph file (JSON/CBOR)
        #[arg(long)]
        model: PathBuf,

        /// Settings the circuit was compiled under (JSON/CBOR)
        #[arg(long)]
        settings: PathBuf,

        /// Input data (JSON/CBOR)
        #[arg(long)]
        data: PathBuf,
    },

    /// Derive the proving and verifying keys
    Setup {
        /// Input graph file (JSON/CBOR)
        #[arg(long)]
        model: PathBuf,

        /// Settings the circuit was compiled under (JSON/CBOR)
        #[arg(long)]
        settings: PathBuf,

        /// SRS path (binary)
        #[arg(long)]
        srs: PathBuf,

        /// Output verifying key path
        #[arg(long, default_value = "model.vk")]
        vk: PathBuf,

        /// Output proving key path
        #[arg(long, default_value = "model.pk")]
        pk: PathBuf,
    },

    /// Produce a proof from a witness
    Prove {
        /// Witness path (JSON/CBOR)
        #[arg(long)]
        witness: PathBuf,

        /// Proving key path
        #[arg(long)]
        pk: PathBuf,

        /// SRS path (binary)
        #[arg(long)]
        srs: PathBuf,

        /// Fiat–Shamir transcript strategy
        #[arg(long, value_enum, default_value_t = TranscriptOpt::Native)]
        transcript: TranscriptOpt,

        /// Proof mode (accum proofs can be aggregated later)
        #[arg(long, value_enum, default_value_t = StrategyOpt::Single)]
        strategy: StrategyOpt,

        /// Output proof path (JSON/CBOR)
        #[arg(long, default_value = "proof.json")]
        out: PathBuf,
    },

    /// Verify a proof
    Verify {
        /// Proof path (JSON/CBOR)
        #[arg(long)]
        proof: PathBuf,

        /// Verifying key path
        #[arg(long)]
        vk: PathBuf,

        /// SRS path (binary)
        #[arg(long)]
        srs: PathBuf,
    },

    /// Fold accumulation-friendly proofs into one aggregate
    Aggregate {
        /// Member proof paths (repeat per member, in order)
        #[arg(long = "proof", required = true)]
        proofs: Vec<PathBuf>,

        /// Member verifying key paths (one per proof, or one shared)
        #[arg(long = "vk", required = true)]
        vks: Vec<PathBuf>,

        /// SRS path (binary, sized for the aggregate circuit)
        #[arg(long)]
        srs: PathBuf,

        /// Whether members are re-verified before folding
        #[arg(long, value_enum, default_value_t = AccumOpt::Safe)]
        mode: AccumOpt,

        /// Fiat–Shamir transcript strategy of the fold
        #[arg(long, value_enum, default_value_t = TranscriptOpt::Evm)]
        transcript: TranscriptOpt,

        /// Output aggregate proof path (JSON/CBOR)
        #[arg(long, default_value = "aggregate.json")]
        out: PathBuf,

        /// Output aggregate verifying key path
        #[arg(long, default_value = "aggregate.vk")]
        out_vk: PathBuf,
    },

    /// Verify an aggregate proof
    VerifyAggregate {
        /// Aggregate proof path (JSON/CBOR)
        #[arg(long)]
        proof: PathBuf,

        /// Aggregate verifying key path
        #[arg(long)]
        vk: PathBuf,

        /// SRS path (binary)
        #[arg(long)]
        srs: PathBuf,
    },

    /// Export an EVM verifier program for a single circuit
    CreateEvmVerifier {
        /// Verifying key path
        #[arg(long)]
        vk: PathBuf,

        /// SRS path (binary)
        #[arg(long)]
        srs: PathBuf,

        /// Settings the circuit was compiled under (JSON/CBOR)
        #[arg(long)]
        settings: PathBuf,

        /// Output bytecode path
        #[arg(long, default_value = "verifier.zkvm")]
        out: PathBuf,

        /// Output assembly listing path
        #[arg(long, default_value = "verifier.asm")]
        out_asm: PathBuf,
    },

    /// Export an EVM verifier program for aggregate proofs
    CreateEvmVerifierAggr {
        /// Aggregate verifying key path
        #[arg(long)]
        vk: PathBuf,

        /// SRS path (binary)
        #[arg(long)]
        srs: PathBuf,

        /// Output bytecode path
        #[arg(long, default_value = "verifier-aggr.zkvm")]
        out: PathBuf,

        /// Output assembly listing path
        #[arg(long, default_value = "verifier-aggr.asm")]
        out_asm: PathBuf,
    },

    /// Run an exported EVM verifier program against a proof file
    VerifyEvm {
        /// Bytecode path produced by create-evm-verifier[-aggr]
        #[arg(long)]
        bytecode: PathBuf,

        /// Proof path (JSON/CBOR), passed as calldata
        #[arg(long)]
        proof: PathBuf,
    },

    /// Print a proof's bytes as hex (e.g. for calldata embedding)
    PrintProofHex {
        /// Proof path (JSON/CBOR)
        #[arg(long)]
        proof: PathBuf,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum TranscriptOpt {
    /// Blake3 transcript for off-chain verification
    Native,
    /// Keccak-256 transcript for EVM verification
    Evm,
}

impl From<TranscriptOpt> for TranscriptType {
    fn from(o: TranscriptOpt) -> Self {
        match o {
            TranscriptOpt::Native => Self::Native,
            TranscriptOpt::Evm => Self::Evm,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum StrategyOpt {
    /// Self-contained proof
    Single,
    /// Accumulation-friendly proof, eligible for aggregation
    Accum,
}

impl From<StrategyOpt> for ProofMode {
    fn from(o: StrategyOpt) -> Self {
        match o {
            StrategyOpt::Single => Self::Single,
            StrategyOpt::Accum => Self::Accum,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum TargetOpt {
    /// Minimize circuit size, then maximize scale
    Resources,
    /// Minimize quantization error, then circuit size
    Accuracy,
}

impl From<TargetOpt> for CalibrationTarget {
    fn from(o: TargetOpt) -> Self {
        match o {
            TargetOpt::Resources => Self::Resources,
            TargetOpt::Accuracy => Self::Accuracy,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum AccumOpt {
    /// Re-verify every member proof before folding
    Safe,
    /// Fold without re-verifying members
    Unsafe,
}

impl From<AccumOpt> for AccumulationMode {
    fn from(o: AccumOpt) -> Self {
        match o {
            AccumOpt::Safe => Self::Safe,
            AccumOpt::Unsafe => Self::Unsafe,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Table { model, scale } => table(model, scale),
        Cmd::GenSettings { model, out, args } => gen_settings(model, out, args),
        Cmd::CalibrateSettings {
            model,
            data,
            target,
            out,
            args,
        } => calibrate_settings(model, data, target, out, args),
        Cmd::GenSrs { logrows, out } => gen_srs_cmd(logrows, out),
        Cmd::GenWitness {
            model,
            settings,
            data,
            out,
        } => gen_witness(model, settings, data, out),
        Cmd::Mock {
            model,
            settings,
            data,
        } => mock_cmd(model, settings, data),
        Cmd::Setup {
            model,
            settings,
            srs,
            vk,
            pk,
        } => setup_cmd(model, settings, srs, vk, pk),
        Cmd::Prove {
            witness,
            pk,
            srs,
            transcript,
            strategy,
            out,
        } => prove_cmd(witness, pk, srs, transcript, strategy, out),
        Cmd::Verify { proof, vk, srs } => verify_cmd(proof, vk, srs),
        Cmd::Aggregate {
            proofs,
            vks,
            srs,
            mode,
            transcript,
            out,
            out_vk,
        } => aggregate_cmd(proofs, vks, srs, mode, transcript, out, out_vk),
        Cmd::VerifyAggregate { proof, vk, srs } => verify_aggregate_cmd(proof, vk, srs),
        Cmd::CreateEvmVerifier {
            vk,
            srs,
            settings,
            out,
            out_asm,
        } => create_evm_verifier(vk, srs, settings, out, out_asm),
        Cmd::CreateEvmVerifierAggr {
            vk,
            srs,
            out,
            out_asm,
        } => create_evm_verifier_aggr(vk, srs, out, out_asm),
        Cmd::VerifyEvm { bytecode, proof } => verify_evm(bytecode, proof),
        Cmd::PrintProofHex { proof } => print_proof_hex(proof),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Load a graph file and build the validated graph at `scale`.
fn load_graph(model: &Path, scale: u32) -> Result<OpGraph> {
    let file = GraphFile::load(model)
        .with_context(|| format!("reading graph from {}", model.display()))?;
    OpGraph::new(&file.nodes, scale).context("validating graph")
}

fn table(model: PathBuf, scale: u32) -> Result<()> {
    let graph = load_graph(&model, scale)?;
    println!("{}", graph.table());
    Ok(())
}

fn gen_settings(model: PathBuf, out: PathBuf, args: RunArgsOpt) -> Result<()> {
    let run_args = RunArgs::from(args);
    let graph = load_graph(&model, run_args.scale)?;
    let settings = graph
        .compile(&run_args, CalibrationTarget::Resources)
        .context("compiling graph")?;

    write_auto(&out, &settings).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "Compiled {} constraints into 2^{} rows → {}",
        settings.num_constraints,
        settings.run_args.logrows,
        out.display()
    );
    Ok(())
}

fn calibrate_settings(
    model: PathBuf,
    data: PathBuf,
    target: TargetOpt,
    out: PathBuf,
    args: RunArgsOpt,
) -> Result<()> {
    let file = GraphFile::load(&model)
        .with_context(|| format!("reading graph from {}", model.display()))?;
    let input: InputData =
        read_auto(&data).with_context(|| format!("reading data from {}", data.display()))?;
    let run_args = RunArgs::from(args);

    info!(target = ?target, "calibrating");
    let report = calibrate(
        &file.nodes,
        &run_args,
        target.into(),
        &[input.input_data],
    )
    .context("calibration failed")?;

    write_auto(&out, &report.settings).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "Calibrated: scale={}, logrows={}, error={:.6}{} → {}",
        report.scale,
        report.settings.run_args.logrows,
        report.best_error,
        if report.tolerance_met {
            ""
        } else {
            " (tolerance NOT met)"
        },
        out.display()
    );
    Ok(())
}

fn gen_srs_cmd(logrows: u32, out: PathBuf) -> Result<()> {
    let srs = gen_srs(logrows).context("generating SRS")?;
    srs.save(&out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!(
        "Generated SRS for 2^{logrows} rows (digest {}) → {}",
        short_hex(&srs.digest()),
        out.display()
    );
    Ok(())
}

fn gen_witness(model: PathBuf, settings: PathBuf, data: PathBuf, out: PathBuf) -> Result<()> {
    let settings: Settings = read_auto(&settings)
        .with_context(|| format!("reading settings from {}", settings.display()))?;
    let graph = load_graph(&model, settings.run_args.scale)?;
    let input: InputData =
        read_auto(&data).with_context(|| format!("reading data from {}", data.display()))?;

    let witness = forward(&graph, &settings, &input).context("forward pass failed")?;
    write_auto(&out, &witness).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "Witness with {} instance digests → {}",
        witness.instances().len(),
        out.display()
    );
    Ok(())
}

fn mock_cmd(model: PathBuf, settings: PathBuf, data: PathBuf) -> Result<()> {
    let settings: Settings = read_auto(&settings)
        .with_context(|| format!("reading settings from {}", settings.display()))?;
    let graph = load_graph(&model, settings.run_args.scale)?;
    let input: InputData =
        read_auto(&data).with_context(|| format!("reading data from {}", data.display()))?;

    mock(&graph, &settings, &input).context("mock run failed")?;
    println!("OK: all constraints satisfied");
    Ok(())
}

fn setup_cmd(
    model: PathBuf,
    settings: PathBuf,
    srs: PathBuf,
    vk_out: PathBuf,
    pk_out: PathBuf,
) -> Result<()> {
    let settings: Settings = read_auto(&settings)
        .with_context(|| format!("reading settings from {}", settings.display()))?;
    let graph = load_graph(&model, settings.run_args.scale)?;
    let srs = Srs::load(&srs).with_context(|| format!("reading SRS from {}", srs.display()))?;

    let (pk, vk) = setup(&graph, &settings, &srs).context("setup failed")?;
    save_vk(&vk_out, &vk).with_context(|| format!("writing {}", vk_out.display()))?;
    save_pk(&pk_out, &pk).with_context(|| format!("writing {}", pk_out.display()))?;
    println!(
        "Keys for circuit {} → {} / {}",
        short_hex(&vk.fingerprint),
        vk_out.display(),
        pk_out.display()
    );
    Ok(())
}

fn prove_cmd(
    witness: PathBuf,
    pk: PathBuf,
    srs: PathBuf,
    transcript: TranscriptOpt,
    strategy: StrategyOpt,
    out: PathBuf,
) -> Result<()> {
    let witness: Witness = read_auto(&witness)
        .with_context(|| format!("reading witness from {}", witness.display()))?;
    let pk = load_pk(&pk).with_context(|| format!("reading proving key from {}", pk.display()))?;
    let srs = Srs::load(&srs).with_context(|| format!("reading SRS from {}", srs.display()))?;

    let artifact = prove(&pk, &srs, &witness, transcript.into(), strategy.into())
        .context("proving failed")?;
    write_auto(&out, &artifact).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "Proved ({} bytes, {} transcript, {} mode) → {}",
        artifact.proof_bytes.len(),
        artifact.transcript,
        artifact.mode,
        out.display()
    );
    Ok(())
}

fn verify_cmd(proof: PathBuf, vk: PathBuf, srs: PathBuf) -> Result<()> {
    let artifact: ProofArtifact =
        read_auto(&proof).with_context(|| format!("reading proof from {}", proof.display()))?;
    let vk = load_vk(&vk).with_context(|| format!("reading verifying key from {}", vk.display()))?;
    let srs = Srs::load(&srs).with_context(|| format!("reading SRS from {}", srs.display()))?;

    if verify(&vk, &srs, &artifact).context("verification errored")? {
        println!("OK: proof verified");
        Ok(())
    } else {
        println!("FAIL: proof rejected");
        std::process::exit(1);
    }
}

fn aggregate_cmd(
    proofs: Vec<PathBuf>,
    vks: Vec<PathBuf>,
    srs: PathBuf,
    mode: AccumOpt,
    transcript: TranscriptOpt,
    out: PathBuf,
    out_vk: PathBuf,
) -> Result<()> {
    if vks.len() != proofs.len() && vks.len() != 1 {
        bail!(
            "got {} proofs but {} verifying keys (pass one --vk per --proof, or a single shared one)",
            proofs.len(),
            vks.len()
        );
    }
    let srs = Srs::load(&srs).with_context(|| format!("reading SRS from {}", srs.display()))?;

    let mut members = Vec::with_capacity(proofs.len());
    for (i, path) in proofs.iter().enumerate() {
        let artifact: ProofArtifact =
            read_auto(path).with_context(|| format!("reading proof from {}", path.display()))?;
        let vk_path = if vks.len() == 1 { &vks[0] } else { &vks[i] };
        let vk = load_vk(vk_path)
            .with_context(|| format!("reading verifying key from {}", vk_path.display()))?;
        members.push((artifact, vk));
    }

    let (agg, avk) = aggregate(&members, &srs, mode.into(), transcript.into())
        .context("aggregation failed")?;
    write_auto(&out, &agg).with_context(|| format!("writing {}", out.display()))?;
    zkml_core::write_bin(&out_vk, &avk).with_context(|| format!("writing {}", out_vk.display()))?;
    println!(
        "Aggregated {} proofs → {} (key {})",
        agg.members.len(),
        out.display(),
        out_vk.display()
    );
    Ok(())
}

fn verify_aggregate_cmd(proof: PathBuf, vk: PathBuf, srs: PathBuf) -> Result<()> {
    let agg: AggregateProof =
        read_auto(&proof).with_context(|| format!("reading aggregate from {}", proof.display()))?;
    let avk: AggregateVerifyingKey = zkml_core::read_bin(&vk)
        .with_context(|| format!("reading aggregate key from {}", vk.display()))?;
    let srs = Srs::load(&srs).with_context(|| format!("reading SRS from {}", srs.display()))?;

    if verify_aggregate(&avk, &srs, &agg).context("verification errored")? {
        println!("OK: aggregate verified ({} members)", agg.members.len());
        Ok(())
    } else {
        println!("FAIL: aggregate rejected");
        std::process::exit(1);
    }
}

fn create_evm_verifier(
    vk: PathBuf,
    srs: PathBuf,
    settings: PathBuf,
    out: PathBuf,
    out_asm: PathBuf,
) -> Result<()> {
    let vk = load_vk(&vk).with_context(|| format!("reading verifying key from {}", vk.display()))?;
    let srs = Srs::load(&srs).with_context(|| format!("reading SRS from {}", srs.display()))?;
    let settings: Settings = read_auto(&settings)
        .with_context(|| format!("reading settings from {}", settings.display()))?;

    let artifact = export_verifier(&vk, &srs, &settings).context("export failed")?;
    fs::write(&out, &artifact.bytecode).with_context(|| format!("writing {}", out.display()))?;
    fs::write(&out_asm, &artifact.assembly)
        .with_context(|| format!("writing {}", out_asm.display()))?;
    println!(
        "EVM verifier ({} bytes) → {} (listing {})",
        artifact.bytecode.len(),
        out.display(),
        out_asm.display()
    );
    Ok(())
}

fn create_evm_verifier_aggr(
    vk: PathBuf,
    srs: PathBuf,
    out: PathBuf,
    out_asm: PathBuf,
) -> Result<()> {
    let avk: AggregateVerifyingKey = zkml_core::read_bin(&vk)
        .with_context(|| format!("reading aggregate key from {}", vk.display()))?;
    let srs = Srs::load(&srs).with_context(|| format!("reading SRS from {}", srs.display()))?;

    let artifact = export_aggregate_verifier(&avk, &srs).context("export failed")?;
    fs::write(&out, &artifact.bytecode).with_context(|| format!("writing {}", out.display()))?;
    fs::write(&out_asm, &artifact.assembly)
        .with_context(|| format!("writing {}", out_asm.display()))?;
    println!(
        "EVM aggregate verifier ({} bytes) → {} (listing {})",
        artifact.bytecode.len(),
        out.display(),
        out_asm.display()
    );
    Ok(())
}

fn verify_evm(bytecode: PathBuf, proof: PathBuf) -> Result<()> {
    let program = fs::read(&bytecode)
        .with_context(|| format!("reading bytecode from {}", bytecode.display()))?;
    let calldata =
        fs::read(&proof).with_context(|| format!("reading proof from {}", proof.display()))?;

    if execute(&program, &calldata).context("verifier program errored")? {
        println!("OK: proof verified by EVM program");
        Ok(())
    } else {
        println!("FAIL: proof rejected by EVM program");
        std::process::exit(1);
    }
}

fn print_proof_hex(proof: PathBuf) -> Result<()> {
    let artifact: ProofArtifact =
        read_auto(&proof).with_context(|| format!("reading proof from {}", proof.display()))?;
    println!("0x{}", artifact.hex());
    Ok(())
}
