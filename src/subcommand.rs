use super::*;

mod chains;
mod serve;
mod template;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "List the supported blockchains")]
    Chains(chains::Chains),
    #[command(about = "Run the merged-mining pool server")]
    Serve(serve::Serve),
    #[command(about = "Fetch and print one work template")]
    Template(template::Template),
}

impl Subcommand {
    pub(crate) fn run(self, options: Options) -> Result {
        match self {
            Self::Chains(chains) => chains.run(),
            Self::Serve(serve) => {
                Runtime::new()?.block_on(async { serve.run(options).await })
            }
            Self::Template(template) => {
                Runtime::new()?.block_on(async { template.run(options).await })
            }
        }
    }
}
