use std::fmt::Debug;

/// Classifies the current environment as a CI system or not.
pub trait CiDetector: Send + Sync + Debug {
    /// Name of the detected CI system, or `None` outside of CI.
    fn detect(&self) -> Option<String>;
}

/// Matches when the variable is set to a non-empty value.
enum Probe {
    Set(&'static str),
    Equals(&'static str, &'static str),
}

// First match wins, so vendors that also export a generic variable
// (e.g. `CI=true`) must come before the generic fallback.
const VENDORS: &[(Probe, &str)] = &[
    (Probe::Set("GERRIT_PROJECT"), "gerrit"),
    (Probe::Set("SYSTEM_TEAMFOUNDATIONCOLLECTIONURI"), "azure-pipelines"),
    (Probe::Set("BITRISE_IO"), "bitrise"),
    (Probe::Set("BUDDY_WORKSPACE_ID"), "buddy"),
    (Probe::Set("BUILDKITE"), "buildkite"),
    (Probe::Set("CIRRUS_CI"), "cirrus"),
    (Probe::Set("GITLAB_CI"), "gitlab"),
    (Probe::Set("APPVEYOR"), "appveyor"),
    (Probe::Set("CIRCLECI"), "circle-ci"),
    (Probe::Set("SEMAPHORE"), "semaphore"),
    (Probe::Set("DRONE"), "drone"),
    (Probe::Set("DSARI"), "dsari"),
    (Probe::Set("GITHUB_ACTION"), "github-actions"),
    (Probe::Set("TDDIUM"), "tddium"),
    (Probe::Set("SCREWDRIVER"), "screwdriver"),
    (Probe::Set("STRIDER"), "strider"),
    (Probe::Set("TASKCLUSTER_ROOT_URL"), "taskcluster"),
    (Probe::Set("JENKINS_URL"), "jenkins"),
    (Probe::Set("bamboo.buildKey"), "bamboo"),
    (Probe::Set("GO_PIPELINE_NAME"), "gocd"),
    (Probe::Set("HUDSON_URL"), "hudson"),
    (Probe::Set("WERCKER"), "wercker"),
    (Probe::Set("NETLIFY"), "netlify"),
    (Probe::Set("NOW_GITHUB_DEPLOYMENT"), "now-github"),
    (Probe::Set("GITLAB_DEPLOYMENT"), "now-gitlab"),
    (Probe::Set("BITBUCKET_DEPLOYMENT"), "now-bitbucket"),
    (Probe::Set("BITBUCKET_BUILD_NUMBER"), "bitbucket-pipelines"),
    (Probe::Set("NOW_BUILDER"), "now"),
    (Probe::Set("VERCEL_GITHUB_DEPLOYMENT"), "vercel-github"),
    (Probe::Set("VERCEL_GITLAB_DEPLOYMENT"), "vercel-gitlab"),
    (Probe::Set("VERCEL_BITBUCKET_DEPLOYMENT"), "vercel-bitbucket"),
    (Probe::Set("VERCEL_URL"), "vercel"),
    (Probe::Set("MAGNUM"), "magnum"),
    (Probe::Set("NEVERCODE"), "nevercode"),
    (Probe::Set("RENDER"), "render"),
    (Probe::Set("SAIL_CI"), "sail"),
    (Probe::Set("SHIPPABLE"), "shippable"),
    (Probe::Set("TEAMCITY_VERSION"), "teamcity"),
    (Probe::Equals("CI_NAME", "sourcehut"), "sourcehut"),
    (Probe::Equals("CI_NAME", "codeship"), "codeship"),
    (Probe::Set("CODEBUILD_BUILD_ARN"), "aws-codebuild"),
    (Probe::Equals("CI", "woodpecker"), "woodpecker"),
    (Probe::Equals("CI", "true"), "custom"),
    (Probe::Equals("CI", "1"), "custom"),
];

/// Runs CI detection against an arbitrary variable lookup.
pub fn detect_ci_with<F>(lookup: F) -> Option<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    VENDORS.iter().find_map(|(probe, name)| {
        let matched = match probe {
            Probe::Set(var) => lookup(*var).is_some_and(|v| !v.is_empty()),
            Probe::Equals(var, expected) => lookup(*var).is_some_and(|v| v == *expected),
        };
        matched.then_some(*name)
    })
}

/// Detects CI systems from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCiDetector;

impl CiDetector for EnvCiDetector {
    fn detect(&self) -> Option<String> {
        detect_ci_with(|name| std::env::var(name).ok()).map(str::to_string)
    }
}

/// Always reports the same answer.
#[derive(Debug, Clone, Default)]
pub struct FixedCiDetector(pub Option<String>);

impl FixedCiDetector {
    pub fn ci(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CiDetector for FixedCiDetector {
    fn detect(&self) -> Option<String> {
        self.0.clone()
    }
}
