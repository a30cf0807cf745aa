#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
extern crate docopt;
extern crate env_logger;
extern crate read_across;

use std::fs;
use std::process;
use std::sync::Arc;

use docopt::Docopt;
use read_across::*;
use read_across::utils::{load_fingerprints, store_predictions};
use read_across::validation::DEFAULT_REPEATS;

const USAGE: &'static str = "
Read-across prediction of substance properties.

Training and query files are headerless CSV files with rows
    id,value,token1,token2,...
where the tokens are the substance's fingerprint. The value may be
empty; repeated ids add further measurements.

Usage: read-across crossvalidate [--folds=<k>] [--repeats=<r>] [options] <training-file>
       read-across loo [options] <training-file>
       read-across predict [options] <training-file> <query-file>
       read-across (--help | --version)

Options:
    -f, --feature=<name>        Name of the prediction feature [default: endpoint].
    --fingerprint=<type>        Fingerprint type of the file tokens [default: MP2D].
    -c, --config=<file>         JSON model configuration.
    -o, --output=<file>         Store predictions into a CSV file.
    -k, --folds=<k>             Number of cross-validation folds [default: 10].
    -r, --repeats=<r>           Number of cross-validation repeats [default: 3].
    --seed=<seed>               PRNG seed for fold shuffling.
    -h, --help                  Show help.
    --version                   Show the version.
";

#[derive(Deserialize)]
struct Args {
    flag_feature: String,
    flag_fingerprint: String,
    flag_config: Option<String>,
    flag_output: Option<String>,
    flag_folds: usize,
    flag_repeats: usize,
    flag_seed: Option<u64>,
    arg_training_file: String,
    arg_query_file: Option<String>,
    cmd_crossvalidate: bool,
    cmd_loo: bool,
    cmd_predict: bool,
}

fn main() {
    env_logger::init();

    // Parse args from command line.
    let args: Args = Docopt::new(USAGE)
                            .and_then(|d| d.version(Some(env!("CARGO_PKG_VERSION").to_string()))
                                           .deserialize())
                            .unwrap_or_else(|e| e.exit());

    if let Err(e) = run(args) {
        eprintln!("read-across: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match args.flag_config {
        Some(ref path) => Config::from_json(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if config.descriptors.is_none() {
        config.descriptors = Some(DescriptorMethod::Fingerprint { kind: args.flag_fingerprint.clone() });
    }
    if args.flag_seed.is_some() {
        config.seed = args.flag_seed;
    }

    // Load training and query data.
    let (training, mut descriptors) = load_fingerprints(&args.arg_training_file,
                                                        &args.flag_feature,
                                                        &args.flag_fingerprint)?;
    let query = match args.arg_query_file {
        Some(ref path) => {
            let (query, table) = load_fingerprints(path, &args.flag_feature, &args.flag_fingerprint)?;
            descriptors.merge(table);
            Some(query)
        }
        None => None,
    };
    info!("Loaded {} training substances from {}", training.len(), args.arg_training_file);

    let context = Context::new(Arc::new(CachedDescriptors::new(descriptors)));
    let feature = FeatureId::from(args.flag_feature.as_str());
    let model = Model::create(&training, &feature, &config, &context)?;

    let predictions: Vec<Prediction> = if args.cmd_crossvalidate {
        let repeats = match args.flag_repeats {
            0 => {
                warn!("No repeats requested, using {}", DEFAULT_REPEATS);
                DEFAULT_REPEATS
            }
            r => r,
        };
        if repeats > 1 {
            let repeated = RepeatedCrossValidation::create(&model, args.flag_folds, repeats, None)?;
            for (i, cv) in repeated.crossvalidations().iter().enumerate() {
                println!("Repeat {}/{}", i + 1, repeated.len());
                println!("{}\n", cv.statistics());
            }
            repeated.crossvalidations()
                    .last()
                    .map(|cv| cv.predictions().values().cloned().collect())
                    .unwrap_or_default()
        } else {
            let cv = CrossValidation::create(&model, args.flag_folds, None)?;
            println!("{}", cv.statistics());
            cv.predictions().values().cloned().collect()
        }
    } else if args.cmd_loo {
        let loo = LeaveOneOut::create(&model)?;
        println!("{}", loo.statistics());
        loo.predictions().values().cloned().collect()
    } else if args.cmd_predict {
        let query = query.ok_or_else(|| Error::bad_request("No query file"))?;
        let predictions = model.predict_all(query.substances(), Mode::Predict);
        for p in &predictions {
            println!("{}\t{}\t{}", p.substance,
                     p.value.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                     p.confidence);
        }
        predictions
    } else {
        // Docopt shouldn't let this happen.
        return Err(Error::bad_request("Unknown command"));
    };

    if let Some(ref output) = args.flag_output {
        store_predictions(&predictions, output)?;
        info!("Stored {} predictions into {}", predictions.len(), output);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify that cross-validation is repeated three times unless
    /// told otherwise.
    #[test]
    fn default_repeats() {
        let args: Args = Docopt::new(USAGE)
                                .and_then(|d| d.argv(vec!["read-across", "crossvalidate", "train.csv"])
                                               .deserialize())
                                .unwrap();

        assert!(args.cmd_crossvalidate);
        assert!(args.flag_repeats == DEFAULT_REPEATS);
        assert!(args.flag_folds == 10);
    }
}
