use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::filter::{self, is_protected};
use super::icons::{BRANCH_ICON, PR_ICON, REPO_ICON};
use super::{account_name, header, Menu, MenuItem, RenderContext, StateColor, REPO_COLOR};
use crate::action::{ActionKind, ActionRequest};
use crate::bitbucket::{ApiError, Bitbucket, Branch, BranchListing, PullRequest};

#[derive(Debug)]
pub struct RepoActivity {
    pub repo: String,
    pub activity: Result<Activity, ApiError>,
}

#[derive(Debug)]
pub struct Activity {
    pub branches: BranchListing,
    pub pull_requests: Vec<PullRequest>,
}

/// Poll branches and open pull requests of every recently updated repository.
pub async fn collect(api: &dyn Bitbucket, now: DateTime<Utc>) -> Result<Vec<RepoActivity>, ApiError> {
    let repos = api.recent_repositories(filter::repository_cutoff(now)).await?;
    let repos = filter::recent_repositories(repos, now);
    info!(repos = repos.len(), "recent repositories");

    let mut out = Vec::with_capacity(repos.len());
    for repo in repos {
        let name = repo.path_name();
        let activity = collect_repo(api, name).await;
        if let Err(err) = &activity {
            warn!(repo = %repo.name, %err, "skipping repository");
        }
        out.push(RepoActivity {
            repo: name.to_string(),
            activity,
        });
    }
    Ok(out)
}

async fn collect_repo(api: &dyn Bitbucket, repo: &str) -> Result<Activity, ApiError> {
    let pull_requests = filter::open_pull_requests(api.open_pull_requests(repo).await?);
    let branches = api.branches(repo).await?;
    Ok(Activity {
        branches,
        pull_requests,
    })
}

pub fn title() -> MenuItem {
    MenuItem::new("").image(PR_ICON)
}

pub fn render(ctx: &RenderContext, repos: &[RepoActivity]) -> Menu {
    let mut menu = Menu::new();
    header(&mut menu, title());

    for repo in repos {
        menu.separator();
        menu.push(
            MenuItem::new(&repo.repo)
                .href(ctx.repo_url(&repo.repo))
                .color(REPO_COLOR)
                .template_image(REPO_ICON),
        );
        let activity = match &repo.activity {
            Ok(activity) => activity,
            Err(err) => {
                render_failure(&mut menu, err);
                continue;
            }
        };

        menu.separator();
        menu.push(MenuItem::new("Branches"));
        menu.separator();
        menu.push(MenuItem::nested(1, format!("Total: {}", activity.branches.total)));
        for branch in &activity.branches.branches {
            render_branch(&mut menu, ctx, &repo.repo, branch);
        }

        menu.separator();
        menu.push(MenuItem::new("Pull Requests"));
        render_new_pr(&mut menu, ctx, &repo.repo);
        for pr in &activity.pull_requests {
            render_pr(&mut menu, ctx, &repo.repo, pr);
        }
    }
    menu
}

pub fn render_unavailable(err: &ApiError) -> Menu {
    let mut menu = Menu::new();
    header(&mut menu, title());
    menu.separator();
    render_failure(&mut menu, err);
    menu
}

fn render_failure(menu: &mut Menu, err: &ApiError) {
    menu.push(MenuItem::nested(1, format!("failed to load: {err}")).color(StateColor::Failed.hex()));
}

/// Repository-level actions that create something new.
fn render_new_pr(menu: &mut Menu, ctx: &RenderContext, repo: &str) {
    menu.push(MenuItem::new("new"));
    for (label, kind) in [
        ("release PR", ActionKind::ReleasePr),
        ("hotfix PR", ActionKind::HotfixPr),
        ("merge to sandbox", ActionKind::MergeToSandbox),
    ] {
        menu.push(MenuItem::nested(1, label).action(&ctx.program, &ActionRequest::new(repo, kind)));
    }
}

fn render_branch(menu: &mut Menu, ctx: &RenderContext, repo: &str, branch: &Branch) {
    menu.push(
        MenuItem::nested(1, &branch.name)
            .color(ctx.author_color(branch.author()))
            .href(format!("{}/branch/{}", ctx.repo_url(repo), branch.name))
            .template_image(BRANCH_ICON),
    );

    let base = ActionRequest::new(repo, ActionKind::MergeSandbox).with_source_branch(&branch.name);
    let develop = base.for_action(ActionKind::DevelopPr);
    let actions = [
        ("merge to sandbox", base.clone()),
        ("merge to develop", develop.clone().with_merge(true)),
        (
            "develop PR",
            develop.with_merge(false).with_close_source_branch(true),
        ),
    ];
    for (label, request) in &actions {
        menu.push(MenuItem::nested(2, label).action(&ctx.program, request));
    }
    if !is_protected(&branch.name) {
        menu.push(
            MenuItem::nested(2, "delete")
                .action(&ctx.program, &base.for_action(ActionKind::DeleteBranch)),
        );
    }

    menu.push(MenuItem::nested(2, format!("author: {}", account_name(branch.author()))));
    menu.push(MenuItem::nested(2, "message"));
    for line in branch.message().lines() {
        menu.push(MenuItem::nested(3, line));
    }
}

fn render_pr(menu: &mut Menu, ctx: &RenderContext, repo: &str, pr: &PullRequest) {
    menu.push(
        MenuItem::new(format!("#{}-{}", pr.id, pr.title))
            .color(ctx.author_color(pr.author.as_ref()))
            .href(format!("{}/pull-requests/{}", ctx.repo_url(repo), pr.id))
            .template_image(PR_ICON),
    );

    let base = ActionRequest::new(repo, ActionKind::MergeSandbox).with_source_branch(pr.source_branch());
    let by_id = base.clone().with_pr_id(pr.id);
    let actions = [
        ("merge to sandbox", base.clone()),
        ("merge", by_id.for_action(ActionKind::MergePr)),
        ("decline", by_id.for_action(ActionKind::DeclinePr)),
        ("add reviewers", by_id.for_action(ActionKind::PrAddReview)),
    ];
    for (label, request) in &actions {
        menu.push(MenuItem::nested(1, label).action(&ctx.program, request));
    }

    let reviewers: Vec<&str> = pr.reviewers.iter().map(|r| account_name(Some(r))).collect();
    for detail in [
        format!("author: {}", account_name(pr.author.as_ref())),
        format!("reviewer: {}", reviewers.join(",")),
        format!("created at: {}", ctx.timestamp(pr.created_on)),
        format!("updated at: {}", ctx.timestamp(pr.updated_on)),
        format!("source: {}", pr.source_branch()),
        format!("dest: {}", pr.destination_branch()),
    ] {
        menu.push(MenuItem::nested(1, detail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::token;
    use crate::bitbucket::fake::{account, pull_request, repository, FakeBitbucket};
    use crate::bitbucket::types::{Commit, CommitAuthor};
    use crate::menu::tests::context;
    use chrono::TimeDelta;

    fn branch(name: &str, author: Option<&str>, message: &str) -> Branch {
        Branch {
            name: name.to_string(),
            target: Some(Commit {
                message: Some(message.to_string()),
                author: Some(CommitAuthor {
                    user: author.map(account),
                }),
            }),
        }
    }

    fn workspace() -> FakeBitbucket {
        let mut api = FakeBitbucket::default();
        let now = context().now;
        api.repositories = vec![
            repository("shop", now - TimeDelta::days(2)),
            repository("legacy", now - TimeDelta::days(7)),
        ];
        api.branches.insert(
            "shop".to_string(),
            BranchListing {
                branches: vec![
                    branch("feature/login", Some("alice"), "Add login\n\nDetails"),
                    branch("develop", None, "Merge"),
                ],
                total: 12,
            },
        );
        let mut pr = pull_request(17, "Login | form", "bob", "feature/login");
        pr.reviewers = vec![account("carol"), account("dave")];
        let mut merged = pull_request(3, "Old", "bob", "x");
        merged.state = Some("MERGED".to_string());
        api.pull_requests.insert("shop".to_string(), vec![pr, merged]);
        api
    }

    /// Decode the action tokens bound to lines starting with `prefix`.
    fn action_of(lines: &[String], prefix: &str) -> Vec<ActionRequest> {
        lines
            .iter()
            .filter(|l| l.starts_with(prefix))
            .filter_map(|l| l.split(" | ").find_map(|a| a.strip_prefix("param2=")))
            .map(|t| token::decode(t).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_collect_skips_stale_and_closed() {
        let api = workspace();
        let repos = collect(&api, context().now).await.unwrap();
        assert_eq!(repos.len(), 1);
        let activity = repos[0].activity.as_ref().unwrap();
        assert_eq!(activity.pull_requests.len(), 1);
        assert_eq!(activity.branches.total, 12);
    }

    #[tokio::test]
    async fn test_render_layout() {
        let api = workspace();
        let ctx = context();
        let menu = render(&ctx, &collect(&api, ctx.now).await.unwrap());
        let lines = menu.lines();

        assert_eq!(lines[0], format!("| image={PR_ICON}"));
        assert_eq!(lines[2], "Refresh | refresh=true");
        assert!(lines[4].starts_with("shop | href=https://bitbucket.org/acme/shop | color=#D0D0D0"));
        assert_eq!(&lines[5..9], &["---", "Branches", "---", "--Total: 12"]);
        assert!(lines[9].starts_with(
            "--feature/login | color=#3A855D | href=https://bitbucket.org/acme/shop/branch/feature/login"
        ));
        assert!(lines.contains(&"----author: alice".to_string()));
        assert!(lines.contains(&"------Add login".to_string()));
        assert!(lines.contains(&"------".to_string()));
        assert!(lines.contains(&"----author: -".to_string()));

        let pr_line = lines.iter().find(|l| l.starts_with("#17-")).unwrap();
        assert!(pr_line.starts_with(
            "#17-Login ｜ form | color=#09F4F7FB | href=https://bitbucket.org/acme/shop/pull-requests/17"
        ));
        assert!(lines.contains(&"--reviewer: carol,dave".to_string()));
        assert!(lines.contains(&"--created at: 2024/01/02 10:00:00".to_string()));
        assert!(lines.contains(&"--dest: develop".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("#3-")));
    }

    #[tokio::test]
    async fn test_branch_actions() {
        let api = workspace();
        let ctx = context();
        let menu = render(&ctx, &collect(&api, ctx.now).await.unwrap());
        let lines = menu.lines();

        let deletes = action_of(lines, "----delete");
        assert_eq!(deletes.len(), 1, "protected develop must not be deletable");
        assert_eq!(deletes[0].source_branch.as_deref(), Some("feature/login"));
        assert_eq!(deletes[0].action, ActionKind::DeleteBranch);

        let merges = action_of(lines, "----merge to develop");
        assert_eq!(merges.len(), 2);
        assert!(merges.iter().all(|r| r.action == ActionKind::DevelopPr && r.merge == Some(true)));

        let prs = action_of(lines, "----develop PR");
        assert_eq!(prs[0].merge, Some(false));
        assert_eq!(prs[0].close_source_branch, Some(true));
    }

    #[tokio::test]
    async fn test_pull_request_and_new_actions() {
        let api = workspace();
        let ctx = context();
        let menu = render(&ctx, &collect(&api, ctx.now).await.unwrap());
        let lines = menu.lines();

        let new = action_of(lines, "--release PR");
        assert_eq!(new, vec![ActionRequest::new("shop", ActionKind::ReleasePr)]);
        assert_eq!(action_of(lines, "--hotfix PR")[0].action, ActionKind::HotfixPr);

        let sandbox: Vec<_> = action_of(lines, "--merge to sandbox")
            .into_iter()
            .map(|r| r.action)
            .collect();
        assert_eq!(sandbox, vec![ActionKind::MergeToSandbox, ActionKind::MergeSandbox]);

        let merge = &action_of(lines, "--merge |")[0];
        assert_eq!(merge.action, ActionKind::MergePr);
        assert_eq!(merge.pr_id, Some(17));
        assert_eq!(merge.source_branch.as_deref(), Some("feature/login"));
        assert_eq!(action_of(lines, "--decline")[0].action, ActionKind::DeclinePr);
        assert_eq!(action_of(lines, "--add reviewers")[0].action, ActionKind::PrAddReview);
    }

    #[tokio::test]
    async fn test_failing_repository_is_skipped() {
        let mut api = workspace();
        let now = context().now;
        api.repositories.push(repository("broken", now - TimeDelta::hours(1)));
        api.broken.push("broken".to_string());

        let repos = collect(&api, now).await.unwrap();
        let lines = render(&context(), &repos).lines().to_vec();
        assert!(lines.iter().any(|l| l.starts_with("--failed to load:")));
        assert!(lines.iter().any(|l| l.starts_with("#17-")));
    }
}
