use serde_json::{json, Value};

use super::api::{GitHubIssue, GitHubNotification, GitHubRepo};

/// Dashboard row for a repository.
pub fn repo_to_item(repo: &GitHubRepo) -> Value {
    json!({
        "id": repo.id,
        "name": repo.name,
        "full_name": repo.full_name,
        "description": repo.description,
        "language": repo.language,
        "stars": repo.stargazers_count,
        "forks": repo.forks_count,
        "open_issues": repo.open_issues_count,
        "private": repo.private,
        "updated_at": repo.updated_at,
    })
}

/// Dashboard row for a notification.
pub fn notification_to_item(notification: &GitHubNotification) -> Value {
    json!({
        "id": notification.id,
        "reason": notification.reason,
        "unread": notification.unread,
        "updated_at": notification.updated_at,
        "subject_title": notification.subject.title,
        "subject_type": notification.subject.subject_type,
        "subject_url": notification.subject.url,
    })
}

/// Dashboard row for an issue, keyed by `{owner}/{repo}#{number}`.
pub fn issue_to_item(owner: &str, repo: &str, issue: &GitHubIssue) -> Value {
    json!({
        "key": format!("{}/{}#{}", owner, repo, issue.number),
        "repository": format!("{}/{}", owner, repo),
        "number": issue.number,
        "title": issue.title,
        "state": issue.state,
        "author": issue.user.login,
        "created_at": issue.created_at,
        "updated_at": issue.updated_at,
    })
}

pub fn repositories_payload(repos: &[GitHubRepo]) -> Value {
    json!({
        "total": repos.len(),
        "repositories": repos.iter().map(repo_to_item).collect::<Vec<_>>(),
    })
}

pub fn notifications_payload(notifications: &[GitHubNotification]) -> Value {
    let unread = notifications.iter().filter(|n| n.unread).count();
    json!({
        "total": notifications.len(),
        "unread": unread,
        "notifications": notifications.iter().map(notification_to_item).collect::<Vec<_>>(),
    })
}

/// Wraps rows already rendered with [`issue_to_item`].
pub fn open_issues_payload(issues: Vec<Value>) -> Value {
    json!({
        "total": issues.len(),
        "issues": issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::github::api::{IssueUser, NotificationSubject};

    fn make_repo() -> GitHubRepo {
        GitHubRepo {
            id: 1,
            name: "test-repo".to_string(),
            full_name: "testuser/test-repo".to_string(),
            description: Some("A test repo".to_string()),
            language: Some("Rust".to_string()),
            stargazers_count: 42,
            forks_count: 10,
            open_issues_count: 5,
            updated_at: "2026-02-18T00:00:00Z".to_string(),
            private: false,
        }
    }

    fn make_notification(id: &str, unread: bool) -> GitHubNotification {
        GitHubNotification {
            id: id.to_string(),
            reason: "mention".to_string(),
            unread,
            updated_at: "2026-02-18T00:00:00Z".to_string(),
            subject: NotificationSubject {
                title: "Fix the bug".to_string(),
                subject_type: "Issue".to_string(),
                url: Some("https://api.github.com/repos/testuser/test-repo/issues/1".to_string()),
            },
        }
    }

    fn make_issue() -> GitHubIssue {
        GitHubIssue {
            id: 99,
            number: 7,
            title: "Something is broken".to_string(),
            state: "open".to_string(),
            user: IssueUser {
                login: "testuser".to_string(),
            },
            created_at: "2026-02-18T00:00:00Z".to_string(),
            updated_at: "2026-02-18T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_repo_to_item() {
        let item = repo_to_item(&make_repo());
        assert_eq!(item["full_name"], "testuser/test-repo");
        assert_eq!(item["stars"], 42);
        assert_eq!(item["language"], "Rust");
        assert_eq!(item["open_issues"], 5);
        assert_eq!(item["private"], false);
    }

    #[test]
    fn test_notifications_payload_counts_unread() {
        let payload = notifications_payload(&[
            make_notification("n1", true),
            make_notification("n2", false),
        ]);
        assert_eq!(payload["total"], 2);
        assert_eq!(payload["unread"], 1);
        assert_eq!(payload["notifications"][0]["subject_title"], "Fix the bug");
        assert_eq!(payload["notifications"][1]["unread"], false);
    }

    #[test]
    fn test_issue_to_item() {
        let item = issue_to_item("testuser", "test-repo", &make_issue());
        assert_eq!(item["key"], "testuser/test-repo#7");
        assert_eq!(item["repository"], "testuser/test-repo");
        assert_eq!(item["title"], "Something is broken");
        assert_eq!(item["author"], "testuser");

        let payload = open_issues_payload(vec![item]);
        assert_eq!(payload["total"], 1);
    }

    #[test]
    fn test_repositories_payload() {
        let payload = repositories_payload(&[make_repo()]);
        assert_eq!(payload["total"], 1);
        assert_eq!(payload["repositories"][0]["name"], "test-repo");
    }
}
