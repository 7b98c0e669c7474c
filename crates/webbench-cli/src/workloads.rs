#[derive(Debug, Clone)]
pub struct KnownWorkload {
    pub name: &'static str,
    pub description: &'static str,
    pub homepage: &'static str,
    pub default_run_times: u32,
    pub score_field: &'static str,
}

const KNOWN_WORKLOADS: &[KnownWorkload] = &[
    KnownWorkload {
        name: "Speedometer2",
        description: "Responsiveness of web apps built with popular JavaScript frameworks.",
        homepage: "https://browserbench.org/Speedometer2.0/",
        default_run_times: 3,
        score_field: "Total Score",
    },
    KnownWorkload {
        name: "WebXPRT3",
        description: "HTML5 and JavaScript workloads modelled on everyday web tasks.",
        homepage: "https://www.principledtechnologies.com/benchmarkxprt/webxprt/",
        default_run_times: 3,
        score_field: "Total Score",
    },
];

pub fn known_workloads() -> &'static [KnownWorkload] {
    KNOWN_WORKLOADS
}

pub fn find_workload(name: &str) -> Option<&'static KnownWorkload> {
    let needle = name.trim();
    if needle.is_empty() {
        return None;
    }
    KNOWN_WORKLOADS
        .iter()
        .find(|workload| workload.name.eq_ignore_ascii_case(needle))
}
