use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use micro_httpc::{DEFAULT_BUFFER_CAPACITY, DEFAULT_CHUNK_SIZE, DriverConfig, HTTPS_PORT, TlsConnector};
use micro_thing::{Bucket, DEFAULT_APP_HOST, Scope, ThingClient, ThingConfig, ThingError};
use serde_json::Value;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(name = "micro-thing", version, about = "register things and manage bucket objects over https")]
struct Cli {
    #[arg(long, env = "THING_APP_ID")]
    app_id: String,

    #[arg(long, env = "THING_APP_KEY")]
    app_key: String,

    #[arg(long, env = "THING_APP_HOST", default_value = DEFAULT_APP_HOST)]
    app_host: String,

    /// Access token sent as bearer authorization
    #[arg(long, env = "THING_ACCESS_TOKEN")]
    token: Option<String>,

    #[arg(long, default_value_t = HTTPS_PORT)]
    port: u16,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long, default_value_t = DEFAULT_BUFFER_CAPACITY)]
    buffer_capacity: usize,

    /// Connect and per chunk I/O timeout, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ScopeKind {
    App,
    User,
    Group,
    Thing,
}

#[derive(Debug, Args)]
struct BucketArgs {
    #[arg(long, value_enum, default_value_t = ScopeKind::Thing)]
    scope: ScopeKind,

    /// Id of the owning user, group or thing
    #[arg(long)]
    scope_id: Option<String>,

    #[arg(long, default_value = "myBucket")]
    bucket: String,
}

impl BucketArgs {
    fn to_bucket(&self) -> Result<Bucket, ThingError> {
        let scope_id = || self.scope_id.clone().ok_or_else(|| ThingError::invalid_argument("--scope-id is required for this scope"));
        let scope = match self.scope {
            ScopeKind::App => Scope::App,
            ScopeKind::User => Scope::User(scope_id()?),
            ScopeKind::Group => Scope::Group(scope_id()?),
            ScopeKind::Thing => Scope::Thing(scope_id()?),
        };
        Ok(Bucket::new(scope, self.bucket.as_str()))
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a thing, the vendor thing id defaults to the process id
    Register {
        #[arg(long)]
        vendor_thing_id: Option<String>,
        #[arg(long, default_value = "1234")]
        password: String,
        #[arg(long)]
        thing_type: Option<String>,
    },
    NewObject {
        #[command(flatten)]
        bucket: BucketArgs,
        #[arg(long, default_value = "{}")]
        data: String,
    },
    NewObjectWithId {
        #[command(flatten)]
        bucket: BucketArgs,
        #[arg(long, default_value = "my_object")]
        id: String,
        #[arg(long, default_value = "{}")]
        data: String,
    },
    PatchObject {
        #[command(flatten)]
        bucket: BucketArgs,
        #[arg(long, default_value = "my_object")]
        id: String,
        #[arg(long, default_value = "{}")]
        data: String,
        #[arg(long)]
        etag: Option<String>,
    },
    ReplaceObject {
        #[command(flatten)]
        bucket: BucketArgs,
        #[arg(long, default_value = "my_object")]
        id: String,
        #[arg(long, default_value = "{}")]
        data: String,
        #[arg(long)]
        etag: Option<String>,
    },
    GetObject {
        #[command(flatten)]
        bucket: BucketArgs,
        #[arg(long, default_value = "my_object")]
        id: String,
    },
    DeleteObject {
        #[command(flatten)]
        bucket: BucketArgs,
        #[arg(long, default_value = "my_object")]
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("can't install log subscriber: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "request failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ThingError> {
    let mut driver = DriverConfig::default().with_port(cli.port).with_chunk_size(cli.chunk_size).with_buffer_capacity(cli.buffer_capacity);
    if let Some(secs) = cli.timeout {
        driver = driver.with_connect_timeout(Duration::from_secs(secs)).with_io_timeout(Duration::from_secs(secs));
    }
    let config = ThingConfig::new(cli.app_id, cli.app_key).with_app_host(cli.app_host).with_driver(driver);

    let mut client = ThingClient::tls(config)?;
    client.set_access_token(cli.token);

    let result = dispatch(&mut client, cli.command).await;
    print_response(&client);
    result
}

async fn dispatch(client: &mut ThingClient<TlsConnector>, command: Command) -> Result<(), ThingError> {
    match command {
        Command::Register { vendor_thing_id, password, thing_type } => {
            let vendor_thing_id = vendor_thing_id.unwrap_or_else(|| std::process::id().to_string());
            info!(vendor_thing_id = %vendor_thing_id, "register thing");
            let thing = client.register_thing(&vendor_thing_id, &password, thing_type.as_deref()).await?;
            info!(thing_id = %thing.thing_id, "registered");
        }
        Command::NewObject { bucket, data } => {
            info!("create new object");
            let created = client.create_object(&bucket.to_bucket()?, &parse_data(&data)?).await?;
            info!(object_id = %created.object_id, "created");
        }
        Command::NewObjectWithId { bucket, id, data } => {
            info!(id = %id, "create new object with id");
            client.create_object_with_id(&bucket.to_bucket()?, &id, &parse_data(&data)?).await?;
        }
        Command::PatchObject { bucket, id, data, etag } => {
            info!(id = %id, "patch object");
            client.patch_object(&bucket.to_bucket()?, &id, &parse_data(&data)?, etag.as_deref()).await?;
        }
        Command::ReplaceObject { bucket, id, data, etag } => {
            info!(id = %id, "replace object");
            client.replace_object(&bucket.to_bucket()?, &id, &parse_data(&data)?, etag.as_deref()).await?;
        }
        Command::GetObject { bucket, id } => {
            info!(id = %id, "get object");
            client.get_object(&bucket.to_bucket()?, &id).await?;
        }
        Command::DeleteObject { bucket, id } => {
            info!(id = %id, "delete object");
            client.delete_object(&bucket.to_bucket()?, &id).await?;
        }
    }
    Ok(())
}

fn parse_data(data: &str) -> Result<Value, ThingError> {
    Ok(serde_json::from_str(data)?)
}

fn print_response(client: &ThingClient<TlsConnector>) {
    let Some(response) = client.response() else {
        return;
    };
    println!("========response========");
    println!("{}", String::from_utf8_lossy(response.raw()));
    println!("========response========");
    match response.status() {
        Some(status) => println!("response_code: {}", status.as_u16()),
        None => println!("response_code: none"),
    }
    println!("response_body:\n{}", String::from_utf8_lossy(response.body().unwrap_or_default()));
}
