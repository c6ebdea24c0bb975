//! NearChrist 운영 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # SQL 시드용 비밀번호 해시 생성
//! nearchrist hash-password 'admin123'
//!
//! # 설정된 서명 키로 관리자 토큰 발급
//! nearchrist issue-token --id 1 --name Admin --email admin@x.org --role ADMIN
//!
//! # 토큰 검사 (유효하지 않으면 종료 코드 1)
//! nearchrist inspect-token eyJhbGciOi...
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use nearchrist_core::{init_logging, LogConfig};
use tracing::info;

mod commands;

use commands::token::IssueRequest;

#[derive(Parser)]
#[command(name = "nearchrist")]
#[command(about = "NearChrist 디렉터리 게이트웨이 운영 도구", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (NEARCHRIST__* 환경 변수가 우선)
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: PathBuf,

    /// 로그 레벨
    #[arg(long, global = true, default_value = "warn", env = "NEARCHRIST_CLI_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Argon2id 비밀번호 해시 생성 (SQL 시드용)
    HashPassword {
        /// 평문 비밀번호
        #[arg(env = "NEARCHRIST_CLI_PASSWORD", hide_env_values = true)]
        password: String,

        /// 강도 검사 실패 시 거부
        #[arg(long, default_value = "false")]
        strict: bool,
    },

    /// 설정된 서명 키로 액세스 토큰 발급
    IssueToken {
        /// 사용자 ID
        #[arg(long)]
        id: i64,

        /// 표시 이름
        #[arg(long, default_value = "")]
        name: String,

        /// 이메일
        #[arg(long)]
        email: String,

        /// 역할 (여러 번 지정 가능)
        #[arg(long = "role", default_value = "STANDARD")]
        roles: Vec<String>,
    },

    /// 토큰 검증 및 내용 출력
    InspectToken {
        /// 검사할 토큰
        token: String,
    },
}

fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = init_logging(LogConfig::new(cli.log_level.as_str()).with_stderr()) {
        eprintln!("logging disabled: {e}");
    }

    match cli.command {
        Commands::HashPassword { password, strict } => {
            let phc = commands::password::hash(&password, strict)?;
            println!("{phc}");
        }

        Commands::IssueToken {
            id,
            name,
            email,
            roles,
        } => {
            let codec = commands::token::load_codec(&cli.config)?;
            let request = IssueRequest {
                id,
                name,
                email,
                roles,
            };
            let token = commands::token::issue(&codec, request, Utc::now())?;
            info!(id, ttl_secs = codec.ttl().num_seconds(), "Token issued");
            println!("{token}");
        }

        Commands::InspectToken { token } => {
            let codec = commands::token::load_codec(&cli.config)?;
            let (valid, report) = commands::token::inspect(&codec, &token, Utc::now());
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
