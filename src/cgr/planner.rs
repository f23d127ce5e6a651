// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The CGR Planner proper: route-list construction (Dijkstra per payload
//! class), lazy route replacement, arrival-time evaluation, and
//! proximate-node consolidation (spec.md §4.1).

use std::{collections::HashSet, sync::Arc};

use crate::{
    cfg::enums::{PayloadClass, Priority},
    cgr::{
        cache::RouteCache,
        overbooking::{OverbookingManager, QueuedBundle},
        route::{DijkstraWork, ProximateNode, Route},
        trace::{NullTraceSink, Reason, TraceEvent, TraceSink},
    },
    contact_plan::{model::Contact, store::ContactPlanStore},
    error::{DtnError, DtnResult},
};

/// Receiver-motion-margin constant, spec.md §4.1 / §9 Open Question #2,
/// confirmed against `original_source/bp/cgr/libcgr.c:416`. Kept
/// planner-wide rather than per-payload-class or per-span (see DESIGN.md).
const SPEED_OF_LIGHT_MPS_APPROX: f64 = 186_282.0;

/// A bundle as CGR sees it: enough fields to drive routing decisions
/// without depending on bundle serialization (out of scope, spec.md §1).
#[derive(Debug, Clone)]
pub struct Bundle {
    pub bundle_id: u64,
    pub payload_length: u64,
    pub expiration_deadline: i64,
    pub critical: bool,
    pub priority: Priority,
    /// Protocol overhead folded into ECCC (spec.md GLOSSARY: "Estimated
    /// Capacity Consumption, in bytes, including protocol overhead").
    pub protocol_overhead: u64,
}

/// Estimated Capacity Consumption: the bytes a bundle will actually consume
/// on the wire, including protocol overhead (spec.md GLOSSARY).
pub fn eccc(payload_length: u64, protocol_overhead: u64) -> u64 {
    payload_length.saturating_add(protocol_overhead)
}

/// Picks the payload class whose capacity floor is the largest one not
/// exceeding `payload_length` (spec.md §3: "Payload class carries a
/// capacity floor").
pub fn classify_payload(payload_length: u64, floors: &[u64; 3]) -> PayloadClass {
    if payload_length >= floors[2] {
        PayloadClass::Large
    } else if payload_length >= floors[1] {
        PayloadClass::Medium
    } else {
        PayloadClass::Small
    }
}

/// Ties the Contact Plan Store, Route Cache together and exposes the
/// top-level `route` contract (spec.md §4.1).
pub struct CgrPlanner {
    pub local_node: u64,
    pub max_speed_mph: f64,
    pub payload_class_floors: [u64; 3],
    pub cps: Arc<ContactPlanStore>,
    pub cache: Arc<RouteCache>,
}

impl CgrPlanner {
    pub fn new(
        local_node: u64,
        max_speed_mph: f64,
        payload_class_floors: [u64; 3],
        cps: Arc<ContactPlanStore>,
        cache: Arc<RouteCache>,
    ) -> Self {
        Self { local_node, max_speed_mph, payload_class_floors, cps, cache }
    }

    fn owlt_margin_seconds(&self, owlt: u64) -> i64 {
        (((self.max_speed_mph / 3600.0) * owlt as f64) / SPEED_OF_LIGHT_MPS_APPROX) as i64
    }

    /// Returns the (possibly freshly rebuilt) route list for `terminus` at
    /// `class`, rebuilding when the contact plan's edit time has advanced
    /// past the cache's load time (spec.md §8 invariant 6).
    pub fn route_list(
        &self,
        terminus: u64,
        class: PayloadClass,
        current_time: i64,
        trace: &dyn TraceSink,
    ) -> Vec<Route> {
        let edit_time = self.cps.last_edit_time();
        if let Some(fresh) = self.cache.get_fresh(terminus, class as u8, edit_time) {
            return fresh.routes;
        }
        let floor = self.payload_class_floors[class.as_index()];
        let routes = self.build_route_list(terminus, class, floor, current_time, trace);
        self.cache.put(terminus, class as u8, routes.clone(), current_time.max(edit_time));
        routes
    }

    /// Route-list construction, spec.md §4.1: repeatedly run Dijkstra,
    /// suppressing each found route's initial contact, until no further
    /// route is found.
    fn build_route_list(
        &self,
        terminus: u64,
        class: PayloadClass,
        floor: u64,
        current_time: i64,
        trace: &dyn TraceSink,
    ) -> Vec<Route> {
        trace.emit(TraceEvent::BeginRoute { class });
        let contacts = self.cps.live_contacts(current_time);
        let mut suppressed: HashSet<usize> = HashSet::new();
        let mut routes = Vec::new();

        loop {
            let mut work: Vec<DijkstraWork> =
                vec![DijkstraWork::reset(); contacts.len()];
            let best_final = self.dijkstra_search(
                &contacts,
                &mut work,
                &suppressed,
                terminus,
                current_time,
                floor,
                trace,
            );
            let Some(final_idx) = best_final else {
                break;
            };
            let chain = backtrack(&work, final_idx);
            let initial_idx = chain[0];
            let route = extract_route(&contacts, &work, &chain, final_idx, class);
            trace.emit(TraceEvent::AcceptRoute {
                first_hop: route.to_node_nbr,
                from_time: route.from_time,
                arrival_time: route.arrival_time,
                max_capacity: route.max_capacity,
                class,
            });
            suppressed.insert(initial_idx);
            routes.push(route);
        }

        routes.sort_unstable_by_key(|r| r.arrival_time);
        routes
    }

    #[allow(clippy::too_many_arguments)]
    fn dijkstra_search(
        &self,
        contacts: &[Contact],
        work: &mut [DijkstraWork],
        suppressed: &HashSet<usize>,
        terminus: u64,
        current_time: i64,
        floor: u64,
        trace: &dyn TraceSink,
    ) -> Option<usize> {
        let mut best_final: Option<(usize, i64)> = None;

        trace.emit(TraceEvent::ConsiderRoot { from: self.local_node, to: self.local_node });
        self.relax_successors(
            contacts,
            work,
            suppressed,
            self.local_node,
            current_time,
            u64::MAX,
            None,
            terminus,
            floor,
            &mut best_final,
            trace,
        );

        loop {
            let next = contacts
                .iter()
                .enumerate()
                .filter(|(i, _)| !work[*i].visited && !suppressed.contains(i))
                .filter(|(i, _)| work[*i].arrival_time < i64::MAX)
                .filter(|(i, _)| {
                    best_final.is_none_or(|(_, bt)| work[*i].arrival_time <= bt)
                })
                .min_by_key(|(i, _)| work[*i].arrival_time);

            let Some((idx, contact)) = next else {
                break;
            };
            work[idx].visited = true;
            trace.emit(TraceEvent::Hop { from: self.local_node, to: contact.to_node });
            self.relax_successors(
                contacts,
                work,
                suppressed,
                contact.to_node,
                work[idx].arrival_time,
                work[idx].capacity,
                Some(idx),
                terminus,
                floor,
                &mut best_final,
                trace,
            );
        }

        best_final.map(|(idx, _)| idx)
    }

    #[allow(clippy::too_many_arguments)]
    fn relax_successors(
        &self,
        contacts: &[Contact],
        work: &mut [DijkstraWork],
        suppressed: &HashSet<usize>,
        from_node: u64,
        u_arrival: i64,
        u_capacity: u64,
        predecessor: Option<usize>,
        terminus: u64,
        floor: u64,
        best_final: &mut Option<(usize, i64)>,
        trace: &dyn TraceSink,
    ) {
        for (idx, contact) in contacts.iter().enumerate() {
            if contact.from_node != from_node {
                continue;
            }
            trace.emit(TraceEvent::ConsiderContact { from: contact.from_node, to: contact.to_node });

            if work[idx].visited {
                trace.emit(TraceEvent::IgnoreContact { reason: Reason::Visited });
                continue;
            }
            if suppressed.contains(&idx) {
                trace.emit(TraceEvent::IgnoreContact { reason: Reason::Suppressed });
                continue;
            }
            if contact.to_time <= u_arrival {
                trace.emit(TraceEvent::IgnoreContact { reason: Reason::ContactEndsEarly });
                continue;
            }
            if contact.capacity() < floor {
                trace.emit(TraceEvent::IgnoreContact { reason: Reason::CapacityTooSmall });
                continue;
            }
            let Some(range) = self.cps.applicable_range(contact) else {
                trace.emit(TraceEvent::IgnoreContact { reason: Reason::NoRange });
                continue;
            };

            let owlt_margin = self.owlt_margin_seconds(range.owlt_seconds);
            let owlt_eff = range.owlt_seconds as i64 + owlt_margin;
            let transmit_time = contact.from_time.max(u_arrival);
            let arrival_time = transmit_time + owlt_eff;

            trace.emit(TraceEvent::Cost {
                transmit_time,
                owlt: range.owlt_seconds,
                arrival_time,
            });

            if arrival_time < work[idx].arrival_time {
                work[idx].arrival_time = arrival_time;
                work[idx].predecessor = predecessor;
                work[idx].capacity = u_capacity.min(contact.capacity());
                if contact.to_node == terminus
                    && best_final.is_none_or(|(_, bt)| arrival_time < bt)
                {
                    *best_final = Some((idx, arrival_time));
                }
            }
        }
    }

    /// Per-route screening and the overall `route` contract (spec.md §4.1,
    /// §4.1.1, §4.1.3).
    #[allow(clippy::too_many_arguments)]
    pub fn route(
        &self,
        bundle: &Bundle,
        terminus: u64,
        current_time: i64,
        excluded_neighbors: &HashSet<u64>,
        backlog_before_route: impl Fn(&Route) -> (u64, u64),
        trace: &dyn TraceSink,
    ) -> DtnResult<Vec<ProximateNode>> {
        if terminus == self.local_node {
            return Err(DtnError::UnknownTerminus(terminus));
        }

        trace.emit(TraceEvent::BuildRoutes {
            terminus,
            payload_len: bundle.payload_length,
            at_time: current_time,
        });

        let class = classify_payload(bundle.payload_length, &self.payload_class_floors);
        let mut routes = self.route_list(terminus, class, current_time, trace);

        let mut proximates: Vec<ProximateNode> = Vec::new();
        let mut idx = 0;
        while idx < routes.len() {
            let route = routes[idx].clone();
            trace.emit(TraceEvent::CheckRoute {
                class,
                first_hop: route.to_node_nbr,
                from_time: route.from_time,
                arrival_time: route.arrival_time,
            });

            if route.to_time < current_time {
                // 4.1.1 lazy route replacement.
                trace.emit(TraceEvent::RecomputeRoute);
                routes.remove(idx);
                if let Some(replacement) =
                    self.replace_expired_route(&route, terminus, class, current_time, &routes, trace)
                {
                    let insert_at = routes
                        .iter()
                        .position(|r| r.arrival_time > replacement.arrival_time)
                        .unwrap_or(routes.len());
                    routes.insert(insert_at, replacement);
                }
                self.cache.replace_routes(terminus, class as u8, routes.clone());
                continue;
            }

            if route.arrival_time > bundle.expiration_deadline {
                break;
            }
            if route.to_node_nbr == self.local_node {
                trace.emit(TraceEvent::IgnoreRoute { reason: Reason::RouteViaSelf });
                idx += 1;
                continue;
            }
            if bundle.payload_length > route.max_capacity {
                trace.emit(TraceEvent::IgnoreRoute { reason: Reason::RouteCapacityTooSmall });
                idx += 1;
                continue;
            }
            if excluded_neighbors.contains(&route.to_node_nbr) {
                trace.emit(TraceEvent::IgnoreRoute { reason: Reason::InitialContactExcluded });
                idx += 1;
                continue;
            }

            let (prior_claims, total_backlog) = backlog_before_route(&route);
            if let Some(result) = self.evaluate_arrival_time(
                &route,
                bundle,
                current_time,
                prior_claims,
                total_backlog,
            ) {
                let candidate = ProximateNode {
                    neighbor_nbr: route.to_node_nbr,
                    arrival_time: result.arrival_time,
                    forfeit_time: route.to_time,
                    overbooked: result.overbooked,
                    protected: result.protected,
                    hop_count: route.hop_count(),
                    eto: result.eto,
                };
                upsert_proximate(&mut proximates, candidate, trace);
            } else {
                trace.emit(TraceEvent::IgnoreRoute { reason: Reason::RouteTooSlow });
            }
            idx += 1;
        }

        if proximates.is_empty() {
            trace.emit(TraceEvent::NoProximateNode);
            return Err(DtnError::NoRouteFound { terminus });
        }

        Ok(proximates)
    }

    /// Top-level `route` contract (spec.md §4.1): resolves `bundle`'s
    /// proximate nodes, then enqueues it — a clone on every proximate
    /// node's outduct for a critical bundle (spec.md §4.1.3), or on the
    /// single best one for a non-critical bundle, running the Overbooking
    /// Manager's bump pass against that node's `overbooked`/`protected`
    /// figures (spec.md §4.2).
    #[allow(clippy::too_many_arguments)]
    pub fn route_and_enqueue(
        &self,
        bundle: &Bundle,
        terminus: u64,
        current_time: i64,
        excluded_neighbors: &HashSet<u64>,
        backlog_before_route: impl Fn(&Route) -> (u64, u64),
        trace: &dyn TraceSink,
        overbooking: &OverbookingManager,
    ) -> DtnResult<EnqueueOutcome> {
        let proximates =
            self.route(bundle, terminus, current_time, excluded_neighbors, backlog_before_route, trace)?;

        if bundle.critical {
            for node in &proximates {
                let queued = QueuedBundle {
                    bundle_id: bundle.bundle_id,
                    length: eccc(bundle.payload_length, bundle.protocol_overhead),
                    priority: bundle.priority,
                };
                overbooking.enqueue_critical(node.neighbor_nbr, queued);
            }
            return Ok(EnqueueOutcome {
                neighbors: proximates.iter().map(|p| p.neighbor_nbr).collect(),
                bumped: Vec::new(),
            });
        }

        let chosen = select_best(&proximates).expect("proximates is non-empty, checked by route()");
        let queued = QueuedBundle {
            bundle_id: bundle.bundle_id,
            length: eccc(bundle.payload_length, bundle.protocol_overhead),
            priority: bundle.priority,
        };
        let bumped =
            overbooking.enqueue_and_bump(chosen.neighbor_nbr, queued, chosen.overbooked, chosen.protected);
        Ok(EnqueueOutcome { neighbors: vec![chosen.neighbor_nbr], bumped })
    }

    /// spec.md §4.1.1: re-run Dijkstra from the orphaned leading contact's
    /// destination, suppressing every other remaining route's leading
    /// contact.
    fn replace_expired_route(
        &self,
        expired: &Route,
        terminus: u64,
        class: PayloadClass,
        current_time: i64,
        remaining: &[Route],
        trace: &dyn TraceSink,
    ) -> Option<Route> {
        let contacts = self.cps.live_contacts(current_time);
        let mut suppressed: HashSet<usize> = HashSet::new();
        for r in remaining {
            if let Some(pos) = contacts.iter().position(|c| {
                c.from_node == self.local_node && c.to_node == r.to_node_nbr && c.from_time == r.from_time
            }) {
                suppressed.insert(pos);
            }
        }
        let orphan_destination = expired.hops.first()?.to_node;
        let floor = self.payload_class_floors[class.as_index()];

        let mut work: Vec<DijkstraWork> = vec![DijkstraWork::reset(); contacts.len()];
        let mut best_final: Option<(usize, i64)> = None;
        self.relax_successors(
            &contacts,
            &mut work,
            &suppressed,
            orphan_destination,
            current_time,
            u64::MAX,
            None,
            terminus,
            floor,
            &mut best_final,
            trace,
        );
        loop {
            let next = contacts
                .iter()
                .enumerate()
                .filter(|(i, _)| !work[*i].visited && !suppressed.contains(i))
                .filter(|(i, _)| work[*i].arrival_time < i64::MAX)
                .filter(|(i, _)| best_final.is_none_or(|(_, bt)| work[*i].arrival_time <= bt))
                .min_by_key(|(i, _)| work[*i].arrival_time);
            let Some((idx, contact)) = next else { break };
            work[idx].visited = true;
            self.relax_successors(
                &contacts,
                &mut work,
                &suppressed,
                contact.to_node,
                work[idx].arrival_time,
                work[idx].capacity,
                Some(idx),
                terminus,
                floor,
                &mut best_final,
                trace,
            );
        }

        best_final.map(|(final_idx, _)| {
            let chain = backtrack(&work, final_idx);
            extract_route(&contacts, &work, &chain, final_idx, class)
        })
    }

    /// spec.md §4.1.2: arrival-time evaluation for a candidate route.
    fn evaluate_arrival_time(
        &self,
        route: &Route,
        bundle: &Bundle,
        current_time: i64,
        prior_claims_initial: u64,
        total_backlog: u64,
    ) -> Option<ArrivalEvaluation> {
        let initial = *route.hops.first()?;
        let bundle_eccc = eccc(bundle.payload_length, bundle.protocol_overhead);

        // Steps 1-2: allot capacity of contacts preceding the initial one,
        // consuming backlog/prior_claims.
        let mut backlog = total_backlog;
        let mut prior_claims = prior_claims_initial;
        for c in self.cps.contacts_from(self.local_node) {
            if c.to_time > initial.from_time {
                continue;
            }
            let capacity = c.capacity();
            let allot = capacity.min(backlog);
            backlog = backlog.saturating_sub(allot);
            prior_claims = prior_claims.saturating_sub(allot);
        }

        // Step 3.
        let initial_capacity = initial.capacity();
        let allot_at_initial = initial_capacity.min(backlog);
        let overbooked = (allot_at_initial + bundle_eccc).saturating_sub(initial_capacity);
        let protected = backlog.saturating_sub(allot_at_initial);

        // Step 4.
        let eto = current_time.max(route.from_time)
            + checked_div_ceil(prior_claims + bundle_eccc, initial.xmit_rate.max(1));
        if eto >= initial.to_time {
            return None;
        }

        // Step 5: walk each hop.
        let mut transmit_time = eto;
        let mut arrival_time = transmit_time;
        for (i, hop) in route.hops.iter().enumerate() {
            let range = self.cps.applicable_range(hop)?;
            let owlt_margin = self.owlt_margin_seconds(range.owlt_seconds);
            arrival_time = transmit_time + range.owlt_seconds as i64 + owlt_margin;
            if let Some(next_hop) = route.hops.get(i + 1) {
                if arrival_time >= hop.to_time {
                    return None;
                }
                transmit_time = arrival_time.max(next_hop.from_time)
                    + checked_div_ceil(bundle_eccc, next_hop.xmit_rate.max(1));
            }
        }

        if arrival_time > bundle.expiration_deadline {
            return None;
        }

        Some(ArrivalEvaluation { arrival_time, overbooked, protected, eto })
    }
}

struct ArrivalEvaluation {
    arrival_time: i64,
    overbooked: u64,
    protected: u64,
    eto: i64,
}

/// Result of [`CgrPlanner::route_and_enqueue`]: which neighbor(s) the
/// bundle was enqueued on, and — for a non-critical bundle whose initial
/// contact was overbooked — any lower-priority bundles bumped off that
/// neighbor's outduct and due for re-forwarding.
#[derive(Debug, Clone)]
pub struct EnqueueOutcome {
    pub neighbors: Vec<u64>,
    pub bumped: Vec<QueuedBundle>,
}

fn checked_div_ceil(numerator: u64, denominator: u64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    numerator.div_ceil(denominator) as i64
}

fn backtrack(work: &[DijkstraWork], final_idx: usize) -> Vec<usize> {
    let mut chain = Vec::new();
    let mut cur = Some(final_idx);
    while let Some(idx) = cur {
        chain.push(idx);
        cur = work[idx].predecessor;
    }
    chain.reverse();
    chain
}

fn extract_route(
    contacts: &[Contact],
    work: &[DijkstraWork],
    chain: &[usize],
    final_idx: usize,
    class: PayloadClass,
) -> Route {
    let hops: Vec<Contact> = chain.iter().map(|&i| contacts[i]).collect();
    Route {
        to_node_nbr: hops[0].to_node,
        from_time: hops[0].from_time,
        to_time: hops.iter().map(|c| c.to_time).min().unwrap_or(i64::MAX),
        arrival_time: work[final_idx].arrival_time,
        max_capacity: hops.iter().map(|c| c.capacity()).min().unwrap_or(0),
        payload_class: class,
        hops,
    }
}

/// spec.md §4.1.3: upsert into the ProximateNode set keyed by neighbor.
fn upsert_proximate(set: &mut Vec<ProximateNode>, candidate: ProximateNode, trace: &dyn TraceSink) {
    if let Some(existing) = set.iter_mut().find(|p| p.neighbor_nbr == candidate.neighbor_nbr) {
        if candidate.ranks_before(existing) {
            trace.emit(TraceEvent::UpdateProximateNode { reason: Reason::LaterArrivalTime });
            *existing = candidate;
        } else {
            trace.emit(TraceEvent::IgnoreProximateNode { reason: Reason::LaterArrivalTime });
        }
    } else {
        trace.emit(TraceEvent::AddProximateNode);
        set.push(candidate);
    }
}

/// spec.md §4.1.3: non-critical selection — minimum arrival_time, tiebreak
/// fewer hops then lower neighbor number. Critical bundles use every
/// proximate node instead (handled by the caller, which clones per
/// neighbor).
pub fn select_best(proximates: &[ProximateNode]) -> Option<&ProximateNode> {
    proximates.iter().min_by(|a, b| {
        if a.ranks_before(b) {
            std::cmp::Ordering::Less
        } else if b.ranks_before(a) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    })
}

pub fn default_trace() -> NullTraceSink {
    NullTraceSink
}
