use crate::commands::Session;
use crate::github::GitHubService;
use crate::remote::RemoteInfo;
use crate::review::ReviewService;
use anyhow::Result;
use colored::Colorize;

/// Open the current branch's pull request, or the repository when it has none
pub fn run() -> Result<()> {
    let session = Session::open(false)?;
    let current = session.current_branch()?;
    let remote_info = RemoteInfo::from_repo(&session.repo, &session.config)?;

    let url = match session.graph.review_id(&current) {
        Some(id) => remote_info.pr_url(id),
        None if current == session.trunk() => remote_info.repo_url(),
        None => match GitHubService::connect(&session.repo, &session.config)? {
            Some(service) => match service.find_open_request(&current)? {
                Some(request) => service.request_url(request.id),
                None => {
                    println!("{}", format!("No pull request for '{}'.", current).yellow());
                    remote_info.repo_url()
                }
            },
            None => remote_info.repo_url(),
        },
    };

    println!("Opening {} in browser...", url.cyan());
    open_url(&url);
    Ok(())
}

fn open_url(url: &str) {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn().ok();
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn().ok();
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()
            .ok();
    }
}
