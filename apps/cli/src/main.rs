mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    session::{store_user, JWT_KEY},
    FileSelection, FileSelectionOutcome, FileSessionStore, HttpPersistenceClient, Location,
    NewBillFields, Route, Router, RouterOptions, SelectedFile, SessionStore, SubmitOutcome,
};
use shared::domain::User;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "billed", about = "Expense bills from the command line")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record the signed-in user in the session file.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = Role::Employee)]
        role: Role,
        #[arg(long)]
        jwt: Option<String>,
    },
    Logout,
    /// Run initial navigation and print the screen.
    Open {
        #[arg(long)]
        hash: Option<String>,
    },
    Show {
        #[arg(value_enum)]
        target: Target,
    },
    Submit {
        #[arg(long = "type")]
        expense_type: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        vat: String,
        #[arg(long, default_value = "")]
        pct: String,
        #[arg(long, default_value = "")]
        commentary: String,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Role {
    Employee,
    Admin,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
    Login,
    Bills,
    NewBill,
    Dashboard,
}

impl From<Target> for Route {
    fn from(target: Target) -> Self {
        match target {
            Target::Login => Route::Login,
            Target::Bills => Route::Bills,
            Target::NewBill => Route::NewBill,
            Target::Dashboard => Route::Dashboard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = config::load_settings()?;

    let session = Arc::new(
        FileSessionStore::open(&settings.session_file).with_context(|| {
            format!(
                "failed to open session file '{}'",
                settings.session_file.display()
            )
        })?,
    );
    let store = HttpPersistenceClient::new(settings.api_url()?)
        .with_session(Arc::clone(&session) as Arc<dyn SessionStore>);
    let options = RouterOptions::new(settings.origin()?)
        .with_record_update_mode(settings.record_update_mode()?);
    let router = Router::new(session.clone(), Arc::new(store), options);

    match args.command {
        Command::Login { email, role, jwt } => {
            let user = match role {
                Role::Employee => User::employee(email),
                Role::Admin => User::admin(email),
            };
            store_user(session.as_ref(), &user)?;
            if let Some(jwt) = jwt {
                session.set_item(JWT_KEY, &jwt)?;
            }
            info!(session_file = %session.path().display(), "session saved");
            router.navigate(router.home()).await;
        }
        Command::Logout => router.logout().await?,
        Command::Open { hash } => {
            router
                .start(&Location::new("/", hash.unwrap_or_default()))
                .await;
        }
        Command::Show { target } => router.navigate(target.into()).await,
        Command::Submit {
            expense_type,
            name,
            date,
            amount,
            vat,
            pct,
            commentary,
            file,
        } => {
            let fields = NewBillFields {
                expense_type,
                name,
                date,
                amount,
                vat,
                pct,
                commentary,
            };
            submit(&router, fields, file).await?;
        }
    }

    router.drain_background().await;
    println!("{}", router.screen().await.render());
    Ok(())
}

async fn submit(router: &Router, fields: NewBillFields, path: PathBuf) -> Result<()> {
    router.navigate(Route::NewBill).await;
    let Some(controller) = router.new_bill_controller().await else {
        bail!("the new bill form is only available to signed-in employees");
    };

    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read attachment '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("attachment path has no file name")?;
    let mime_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let selection = FileSelection {
        value: path.display().to_string(),
        file: Some(SelectedFile::new(file_name, mime_type, bytes)),
    };
    if let FileSelectionOutcome::Rejected = controller.on_file_selected(selection).await {
        eprintln!(
            "rejected attachment '{}': only png, jpg and jpeg are accepted",
            path.display()
        );
    }

    match controller.submit(&fields).await {
        SubmitOutcome::Submitted { bill_id } => info!(bill_id = %bill_id, "bill created"),
        SubmitOutcome::Invalid => eprintln!("some required fields are missing"),
        SubmitOutcome::UploadFailed(message) | SubmitOutcome::RecordFailed(message) => {
            eprintln!("{message}");
        }
    }
    Ok(())
}
