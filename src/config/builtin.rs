//! Patch sets compiled into the binary.
//!
//! Paths are relative to the application root passed with `--root`.

use crate::config::loader::ConfigError;
use crate::config::schema::PatchSet;
use crate::edit::{Guard, PatchOperation};

const ADMIN_PAGE: &str = "app/(protected)/admin/page.tsx";

/// Route files and how many handlers each one builds a route-handler client in.
const API_ROUTES: &[(&str, usize)] = &[
    ("app/api/halaqah/route.ts", 2),
    ("app/api/halaqah/auto-create/route.ts", 1),
    ("app/api/halaqah/[id]/join/route.ts", 1),
    ("app/api/halaqah/[id]/leave/route.ts", 1),
    ("app/api/halaqah/[id]/promote-waitlist/route.ts", 1),
    ("app/api/halaqah/available-for-thalibah/route.ts", 1),
    ("app/api/thalibah/eligibility/route.ts", 1),
];

/// All compiled-in sets, in the order `apply` runs them by default.
pub fn builtin_sets() -> Vec<PatchSet> {
    vec![admin_halaqah_tab(), api_supabase_imports()]
}

pub fn builtin_set(name: &str) -> Result<PatchSet, ConfigError> {
    let sets = builtin_sets();
    let available = sets
        .iter()
        .map(|set| set.meta.name.clone())
        .collect::<Vec<_>>()
        .join(", ");
    sets.into_iter()
        .find(|set| set.meta.name == name)
        .ok_or_else(|| ConfigError::UnknownSet {
            name: name.to_string(),
            available,
        })
}

fn admin_halaqah_tab() -> PatchSet {
    let edits = vec![
        PatchOperation::replace_first(
            "import AdminOrphanedUsers from '@/components/AdminOrphanedUsers';",
            "import AdminOrphanedUsers from '@/components/AdminOrphanedUsers';\n\
             import { HalaqahManagementTab } from '@/components/HalaqahManagementTab';",
        )
        .unless_contains("import { HalaqahManagementTab }")
        .labeled("import-tab-component"),
        PatchOperation::replace_first(
            "| 'programs' | 'presensi' |",
            "| 'programs' | 'halaqah' | 'presensi' |",
        )
        .unless_contains("| 'halaqah' |")
        .labeled("extend-tab-type"),
        PatchOperation::insert_after(
            "    { id: 'programs' as TabType, name: 'Programs', icon: BookOpen },\n",
            "    { id: 'halaqah' as TabType, name: 'Halaqah', icon: Users },\n",
        )
        .unless_contains("id: 'halaqah' as TabType")
        .labeled("add-tab-entry"),
        PatchOperation::insert_before(
            "        {activeTab === 'reports' && <ReportsTab />}",
            "        {activeTab === 'halaqah' && <HalaqahManagementTab />}\n",
        )
        .unless_contains("<HalaqahManagementTab />")
        .labeled("render-tab-content"),
    ];

    PatchSet::new(
        "admin-halaqah-tab",
        "Add the Halaqah management tab to the admin page",
    )
    .target(ADMIN_PAGE, edits)
}

fn api_supabase_imports() -> PatchSet {
    API_ROUTES.iter().fold(
        PatchSet::new(
            "api-supabase-imports",
            "Move API routes from auth-helpers to the shared server/admin clients",
        ),
        |set, (path, handlers)| set.target(*path, api_route_edits(*handlers)),
    )
}

/// Edits for one route file. Each handler's client construction is its own
/// edit since an anchor only ever matches once.
fn api_route_edits(handlers: usize) -> Vec<PatchOperation> {
    let mut edits = vec![PatchOperation::replace_first(
        "import { createRouteHandlerClient } from '@supabase/auth-helpers-nextjs';\n\
         import { cookies } from 'next/headers';",
        "import { createServerClient } from '@/lib/supabase/server';\n\
         import { createSupabaseAdmin } from '@/lib/supabase';",
    )
    .labeled("swap-imports")];

    for handler in 1..=handlers {
        let label = if handlers == 1 {
            "server-client".to_string()
        } else {
            format!("server-client-{handler}")
        };
        edits.push(
            PatchOperation::replace_first(
                "const supabase = createRouteHandlerClient({ cookies });",
                "const supabase = createServerClient();",
            )
            // only once the import swap has happened
            .guarded_by(Guard::Lacks("import { createServerClient }".to_string()))
            .labeled(label),
        );
    }

    edits.push(
        PatchOperation::insert_before(
            "export async function",
            "const supabaseAdmin = createSupabaseAdmin();\n\n",
        )
        .guarded_by(Guard::Any(vec![
            Guard::Contains("const supabaseAdmin".to_string()),
            Guard::Lacks("import { createSupabaseAdmin }".to_string()),
        ]))
        .labeled("admin-client"),
    );

    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{apply_to_text, OperationStatus};

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(
            builtin_set("admin-halaqah-tab").unwrap().meta.name,
            "admin-halaqah-tab"
        );
        let err = builtin_set("nope").unwrap_err();
        assert!(err.to_string().contains("api-supabase-imports"));
    }

    #[test]
    fn test_builtin_edits_rerun_safely() {
        for set in builtin_sets() {
            for target in &set.targets {
                for op in &target.edits {
                    assert!(!op.is_rerun_unsafe(), "{} in {}", op.display_name(0), set.meta.name);
                }
            }
        }
    }

    #[test]
    fn test_admin_page_patch() {
        let page = "\
import AdminOrphanedUsers from '@/components/AdminOrphanedUsers';
type TabType = 'overview' | 'users' | 'batches' | 'programs' | 'presensi' | 'reports';
  const tabs = [
    { id: 'programs' as TabType, name: 'Programs', icon: BookOpen },
    { id: 'presensi' as TabType, name: 'Presensi', icon: Clock },
  ];
        {activeTab === 'reports' && <ReportsTab />}
";
        let set = admin_halaqah_tab();
        let edits = &set.targets[0].edits;
        let (patched, results) = apply_to_text(page, edits);
        assert!(results.iter().all(|r| r.status == OperationStatus::Patched));
        assert!(patched.contains("import { HalaqahManagementTab } from"));
        assert!(patched.contains("'programs' | 'halaqah' | 'presensi'"));
        assert!(patched.contains(
            "icon: BookOpen },\n    { id: 'halaqah' as TabType, name: 'Halaqah', icon: Users },\n    { id: 'presensi'"
        ));
        assert!(patched.contains(
            "<HalaqahManagementTab />}\n        {activeTab === 'reports'"
        ));

        let (again, results) = apply_to_text(&patched, edits);
        assert_eq!(again, patched);
        assert!(results
            .iter()
            .all(|r| r.status == OperationStatus::SkippedAlreadyPresent));
    }

    fn status_of(results: &[crate::executor::OperationResult], name: &str) -> OperationStatus {
        results
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.status)
            .unwrap()
    }

    #[test]
    fn test_api_route_patch() {
        let route = "\
import { NextResponse } from 'next/server';
import { createRouteHandlerClient } from '@supabase/auth-helpers-nextjs';
import { cookies } from 'next/headers';

export async function GET() {
  const supabase = createRouteHandlerClient({ cookies });
  return NextResponse.json({});
}
";
        let edits = api_route_edits(1);
        let (patched, _) = apply_to_text(route, &edits);
        assert!(patched.contains("import { createSupabaseAdmin } from '@/lib/supabase';"));
        assert!(patched.contains("const supabase = createServerClient();"));
        assert!(patched.contains("const supabaseAdmin = createSupabaseAdmin();\n\nexport async function GET"));

        let (again, results) = apply_to_text(&patched, &edits);
        assert_eq!(again, patched);
        assert_eq!(status_of(&results, "swap-imports"), OperationStatus::SkippedNoAnchor);
        assert_eq!(
            status_of(&results, "admin-client"),
            OperationStatus::SkippedAlreadyPresent
        );
    }

    #[test]
    fn test_multi_handler_route_fully_migrated() {
        let route = "\
import { createRouteHandlerClient } from '@supabase/auth-helpers-nextjs';
import { cookies } from 'next/headers';

export async function GET() {
  const supabase = createRouteHandlerClient({ cookies });
  return list(supabase);
}

export async function POST() {
  const supabase = createRouteHandlerClient({ cookies });
  return create(supabase);
}
";
        let set = api_supabase_imports();
        assert_eq!(set.targets.len(), API_ROUTES.len());
        assert_eq!(set.targets[0].path, "app/api/halaqah/route.ts");

        let (patched, results) = apply_to_text(route, &set.targets[0].edits);
        assert!(results.iter().all(|r| r.status == OperationStatus::Patched));
        assert!(!patched.contains("createRouteHandlerClient"));
        assert_eq!(patched.matches("const supabase = createServerClient();").count(), 2);

        let (again, _) = apply_to_text(&patched, &set.targets[0].edits);
        assert_eq!(again, patched);
    }

    #[test]
    fn test_client_rewrite_waits_for_import_swap() {
        // a handler call without the old import block is left alone
        let route = "\
import { createRouteHandlerClient } from '@supabase/auth-helpers-nextjs';

export async function GET() {
  const supabase = createRouteHandlerClient({ cookies });
}
";
        let (patched, results) = apply_to_text(route, &api_route_edits(1));
        assert_eq!(patched, route);
        assert_eq!(status_of(&results, "swap-imports"), OperationStatus::SkippedNoAnchor);
        assert_eq!(
            status_of(&results, "server-client"),
            OperationStatus::SkippedAlreadyPresent
        );
    }

    #[test]
    fn test_admin_client_needs_import() {
        let route = "export async function GET() {}\n";
        let (patched, results) = apply_to_text(route, &api_route_edits(1));
        assert_eq!(patched, route);
        assert_eq!(
            status_of(&results, "admin-client"),
            OperationStatus::SkippedAlreadyPresent
        );
    }
}
